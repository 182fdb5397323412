//! Guarded state machines.
//!
//! A status is a closed enumeration whose members each declare the statuses
//! they may move to. The successor tables are `'static` data generated by
//! [`status_machine!`](crate::status_machine), fixed at compile time and
//! shared by every thread.
//!
//! # Examples
//!
//! ```rust
//! use storefront::status::StatusValue;
//! use storefront::status_machine;
//!
//! status_machine! {
//!     /// Lifecycle of a support ticket.
//!     pub enum TicketStatus: "ticket status" {
//!         unknown: Unknown = 0,
//!         Open = 1, "Open" => [Resolved, Closed],
//!         Resolved = 2, "Resolved" => [Open, Closed],
//!         Closed = 3, "Closed" => [],
//!     }
//! }
//!
//! assert!(TicketStatus::Open.can_transition_to(TicketStatus::Resolved).is_ok());
//! assert_eq!(
//!     TicketStatus::Closed.transition_to(TicketStatus::Open).unwrap_err().message(),
//!     "Cannot change ticket status from Closed to Open."
//! );
//! assert_eq!(TicketStatus::from_code(2), Ok(TicketStatus::Resolved));
//! assert_eq!(TicketStatus::from_name_unsafe("Archived"), TicketStatus::Unknown);
//! assert!(TicketStatus::Closed.is_terminal());
//! ```

mod status_macro;

use std::fmt;
use std::hash::Hash;

use crate::error::ErrorInfo;
use crate::outcome::Fin;

/// A member of a closed status enumeration with a guarded successor set.
///
/// Implement it with [`status_machine!`](crate::status_machine) rather than
/// by hand.
pub trait StatusValue:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Human-readable name of the status type, used in messages.
    const KIND: &'static str;

    /// Sentinel for stored values this build does not know.
    const UNKNOWN: Self;

    /// Every known member, excluding [`StatusValue::UNKNOWN`].
    const ALL: &'static [Self];

    /// Stable numeric code.
    fn code(self) -> i32;

    /// Display name.
    fn name(self) -> &'static str;

    /// Legal targets. A status may move to itself only if it lists itself.
    fn successors(self) -> &'static [Self];

    /// Checks that moving to `target` is legal.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` when `target` is not a successor.
    fn can_transition_to(self, target: Self) -> Fin<()> {
        if self.successors().contains(&target) {
            Ok(())
        } else {
            Err(ErrorInfo::invalid_operation(format!(
                "Cannot change {} from {self} to {target}.",
                Self::KIND
            )))
        }
    }

    /// Returns `target` when moving to it is legal.
    ///
    /// # Errors
    ///
    /// As [`StatusValue::can_transition_to`].
    fn transition_to(self, target: Self) -> Fin<Self> {
        self.can_transition_to(target).map(|()| target)
    }

    /// Looks a member up by display name, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for unknown names.
    fn from_name(name: &str) -> Fin<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| {
                ErrorInfo::invalid_operation(format!("'{name}' is not a valid {}.", Self::KIND))
            })
    }

    /// Looks a member up by code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for unknown codes.
    fn from_code(code: i32) -> Fin<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.code() == code)
            .ok_or_else(|| {
                ErrorInfo::invalid_operation(format!("{code} is not a valid {} code.", Self::KIND))
            })
    }

    /// Looks a member up by name, mapping unknown names to the sentinel.
    ///
    /// For trusted round-trips such as reading stored data.
    fn from_name_unsafe(name: &str) -> Self {
        Self::from_name(name).unwrap_or(Self::UNKNOWN)
    }

    /// Looks a member up by code, mapping unknown codes to the sentinel.
    fn from_code_unsafe(code: i32) -> Self {
        Self::from_code(code).unwrap_or(Self::UNKNOWN)
    }

    /// Whether this status has no successors.
    fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    /// Whether this is the [`StatusValue::UNKNOWN`] sentinel.
    fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }
}
