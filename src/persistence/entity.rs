//! Entities, audit fields and domain events.

use std::any::Any;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};

// =============================================================================
// Entity
// =============================================================================

/// A persisted row type the pipeline can query, stage and commit.
///
/// Aggregates additionally expose their [`DomainEvents`] through
/// [`Entity::events_mut`]; plain child rows leave the default `None`.
///
/// # Examples
///
/// ```rust
/// use storefront::persistence::{AuditInfo, DomainEvents, Entity};
///
/// #[derive(Debug, Clone)]
/// struct Coupon {
///     id: u32,
///     code: String,
///     audit: AuditInfo,
///     events: DomainEvents,
/// }
///
/// impl Entity for Coupon {
///     type Id = u32;
///     const NAME: &'static str = "Coupon";
///
///     fn id(&self) -> u32 {
///         self.id
///     }
///
///     fn audit_mut(&mut self) -> Option<&mut AuditInfo> {
///         Some(&mut self.audit)
///     }
///
///     fn events_mut(&mut self) -> Option<&mut DomainEvents> {
///         Some(&mut self.events)
///     }
/// }
/// ```
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// Primary key type.
    type Id: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Name used in messages and logs.
    const NAME: &'static str;

    /// The primary key of this row.
    fn id(&self) -> Self::Id;

    /// Audit fields stamped by the transaction runner, if the row has any.
    fn audit_mut(&mut self) -> Option<&mut AuditInfo> {
        None
    }

    /// Pending domain events, if this row is an aggregate root.
    fn events_mut(&mut self) -> Option<&mut DomainEvents> {
        None
    }

    /// Drops eagerly loaded navigations before the row is written.
    fn clear_navigations(&mut self) {}
}

// =============================================================================
// Audit
// =============================================================================

/// Who stamped a change, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuditStamp {
    /// The acting user or system identity.
    pub actor: String,
    /// The stamp time.
    pub at: DateTime<Utc>,
}

impl AuditStamp {
    /// Creates a stamp.
    #[must_use]
    pub fn new(actor: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            actor: actor.into(),
            at,
        }
    }
}

/// Created/updated audit fields carried by audited entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuditInfo {
    /// When the row was first committed.
    pub created_at: Option<DateTime<Utc>>,
    /// Who first committed the row.
    pub created_by: Option<String>,
    /// When the row was last committed.
    pub updated_at: Option<DateTime<Utc>>,
    /// Who last committed the row.
    pub updated_by: Option<String>,
}

impl AuditInfo {
    /// Stamps both the created and the updated fields.
    pub fn stamp_created(&mut self, stamp: &AuditStamp) {
        self.created_at = Some(stamp.at);
        self.created_by = Some(stamp.actor.clone());
        self.stamp_updated(stamp);
    }

    /// Stamps the updated fields.
    pub fn stamp_updated(&mut self, stamp: &AuditStamp) {
        self.updated_at = Some(stamp.at);
        self.updated_by = Some(stamp.actor.clone());
    }
}

// =============================================================================
// Domain events
// =============================================================================

/// A fact recorded by an aggregate during a transition.
///
/// Events are delivered to subscribers only after the owning transaction
/// commits. Subscribers recover the concrete type with
/// [`EventRecord::downcast_ref`].
pub trait DomainEvent: Any + fmt::Debug + Send + Sync {
    /// Stable event name, e.g. `"cart.checked_out"`.
    fn name(&self) -> &'static str;
}

/// The pending events of one aggregate, in the order they were raised.
#[derive(Debug, Clone, Default)]
pub struct DomainEvents {
    pending: Vec<Arc<dyn DomainEvent>>,
}

impl DomainEvents {
    /// Records a new event.
    pub fn raise<T>(&mut self, event: T)
    where
        T: DomainEvent,
    {
        self.pending.push(Arc::new(event));
    }

    /// The pending events.
    #[must_use]
    pub fn pending(&self) -> &[Arc<dyn DomainEvent>] {
        &self.pending
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` when nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes and returns every pending event.
    pub fn drain(&mut self) -> Vec<Arc<dyn DomainEvent>> {
        std::mem::take(&mut self.pending)
    }

    /// Discards every pending event.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// A drained event together with the aggregate that raised it.
#[derive(Debug, Clone)]
pub struct EventRecord {
    /// [`Entity::NAME`] of the raising aggregate.
    pub entity: &'static str,
    /// Display form of the raising aggregate's id.
    pub entity_id: String,
    /// Position in the transaction's dispatch order, starting at zero.
    pub sequence: usize,
    /// The event itself.
    pub event: Arc<dyn DomainEvent>,
}

impl EventRecord {
    /// The event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.event.name()
    }

    /// Returns the event as `T` when it has that concrete type.
    #[must_use]
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: DomainEvent,
    {
        let event: &dyn DomainEvent = &*self.event;
        let event: &dyn Any = event;
        event.downcast_ref::<T>()
    }
}
