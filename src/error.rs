//! Failure values carried by every pipeline.
//!
//! Expected failures (a missing product, an illegal status change, a
//! duplicate e-mail) are ordinary values of type [`ErrorInfo`]. They travel
//! through [`Fin`](crate::outcome::Fin) and are never raised as panics.
//! Unexpected faults ([`ErrorKind::Internal`]) and failures of external
//! dependencies ([`ErrorKind::BadGateway`]) use the same channel but are
//! flagged as not expected so the transaction runner logs them as faults.
//!
//! # Examples
//!
//! ```rust
//! use storefront::error::{ErrorInfo, ErrorKind};
//!
//! let error = ErrorInfo::not_found("Product 42 was not found.");
//! assert_eq!(error.kind(), ErrorKind::NotFound);
//! assert!(error.is_expected());
//! assert_eq!(error.kind().status_code(), 404);
//! ```

use std::any::Any;
use std::fmt;

use thiserror::Error;

// =============================================================================
// ErrorKind
// =============================================================================

/// Machine-readable category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorKind {
    /// Input failed validation.
    Validation,
    /// The requested resource does not exist.
    NotFound,
    /// The request conflicts with the current stored state.
    Conflict,
    /// The operation is not allowed in the current domain state.
    InvalidOperation,
    /// The caller is not authenticated.
    Unauthorized,
    /// The caller is authenticated but not allowed.
    Forbidden,
    /// The request is well formed but cannot be processed.
    Unprocessable,
    /// The caller exceeded a rate limit.
    TooManyRequests,
    /// An external dependency failed.
    BadGateway,
    /// An unexpected fault.
    Internal,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Validation,
        Self::NotFound,
        Self::Conflict,
        Self::InvalidOperation,
        Self::Unauthorized,
        Self::Forbidden,
        Self::Unprocessable,
        Self::TooManyRequests,
        Self::BadGateway,
        Self::Internal,
    ];

    /// Returns `true` for failures produced deliberately by domain or
    /// application code.
    ///
    /// `Internal` and `BadGateway` are the only unexpected kinds.
    #[must_use]
    pub const fn is_expected(self) -> bool {
        !matches!(self, Self::Internal | Self::BadGateway)
    }

    /// The protocol status code a transport maps this kind to.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use storefront::error::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::InvalidOperation.status_code(), 406);
    /// assert_eq!(ErrorKind::Internal.status_code(), 500);
    /// ```
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::InvalidOperation => 406,
            Self::Conflict => 409,
            Self::Unprocessable => 422,
            Self::TooManyRequests => 429,
            Self::BadGateway => 502,
            Self::Internal => 500,
        }
    }

    /// Stable snake-case identifier used in logs and problem payloads.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidOperation => "invalid_operation",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Unprocessable => "unprocessable",
            Self::TooManyRequests => "too_many_requests",
            Self::BadGateway => "bad_gateway",
            Self::Internal => "internal",
        }
    }

    /// Short human title for problem payloads.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Validation => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Conflict with current state",
            Self::InvalidOperation => "Operation not allowed",
            Self::Unauthorized => "Authentication required",
            Self::Forbidden => "Access denied",
            Self::Unprocessable => "Request could not be processed",
            Self::TooManyRequests => "Too many requests",
            Self::BadGateway => "Upstream service failed",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.code())
    }
}

// =============================================================================
// ErrorInfo
// =============================================================================

/// A typed failure: kind, human message and the "is expected" flag.
///
/// `details` is only populated when several validation failures were merged
/// in accumulate mode (see [`accumulate`](crate::outcome::accumulate)).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorInfo {
    kind: ErrorKind,
    message: String,
    expected: bool,
    details: Vec<String>,
}

impl ErrorInfo {
    /// Creates a failure whose "expected" flag follows its kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            expected: kind.is_expected(),
            details: Vec::new(),
        }
    }

    /// Creates a `Validation` failure.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Creates a `NotFound` failure.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Creates a `Conflict` failure.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Creates an `InvalidOperation` failure.
    #[must_use]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOperation, message)
    }

    /// Creates an `Unauthorized` failure.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Creates a `Forbidden` failure.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Creates an `Unprocessable` failure.
    #[must_use]
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, message)
    }

    /// Creates a `TooManyRequests` failure.
    #[must_use]
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TooManyRequests, message)
    }

    /// Creates a `BadGateway` failure for a failed external dependency.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadGateway, message)
    }

    /// Creates an `Internal` failure for an unexpected fault.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// The failure produced by a step that observed cancellation.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::internal("The operation was cancelled.")
    }

    /// Converts a caught panic payload into an `Internal` failure.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::internal(format!("A pipeline step panicked: {reason}"))
    }

    /// The failure category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether domain or application code produced this failure on purpose.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        self.expected
    }

    /// Individual messages merged into this failure by accumulate mode.
    #[must_use]
    pub fn details(&self) -> &[String] {
        &self.details
    }

    /// Returns `true` when this failure has the given kind.
    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Merges two failures into one aggregate `Validation` failure.
    ///
    /// The message lists every member message in order, separated by `"; "`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use storefront::error::ErrorInfo;
    ///
    /// let merged = ErrorInfo::validation("Name is required.")
    ///     .merge(ErrorInfo::validation("E-mail is invalid."));
    /// assert_eq!(merged.message(), "Name is required.; E-mail is invalid.");
    /// assert_eq!(merged.details().len(), 2);
    /// ```
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let mut details = self.into_detail_lines();
        details.extend(other.into_detail_lines());
        Self {
            kind: ErrorKind::Validation,
            message: details.join("; "),
            expected: true,
            details,
        }
    }

    fn into_detail_lines(self) -> Vec<String> {
        if self.details.is_empty() {
            vec![self.message]
        } else {
            self.details
        }
    }
}

// =============================================================================
// Problem
// =============================================================================

/// The structured payload a transport renders for a failure.
///
/// Building a `Problem` is the only piece of the transport mapping this crate
/// owns; routing and response writing belong to the web layer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Problem {
    /// Protocol status code.
    pub status: u16,
    /// Failure category.
    pub kind: ErrorKind,
    /// Short title for the category.
    pub title: String,
    /// The failure message.
    pub detail: String,
    /// Individual validation messages, if any.
    pub errors: Vec<String>,
}

impl From<&ErrorInfo> for Problem {
    fn from(error: &ErrorInfo) -> Self {
        Self {
            status: error.kind.status_code(),
            kind: error.kind,
            title: error.kind.title().to_string(),
            detail: error.message.clone(),
            errors: error.details.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Validation, 400)]
    #[case(ErrorKind::Unauthorized, 401)]
    #[case(ErrorKind::Forbidden, 403)]
    #[case(ErrorKind::NotFound, 404)]
    #[case(ErrorKind::InvalidOperation, 406)]
    #[case(ErrorKind::Conflict, 409)]
    #[case(ErrorKind::Unprocessable, 422)]
    #[case(ErrorKind::TooManyRequests, 429)]
    #[case(ErrorKind::BadGateway, 502)]
    #[case(ErrorKind::Internal, 500)]
    fn status_code_mapping_is_fixed(#[case] kind: ErrorKind, #[case] expected: u16) {
        assert_eq!(kind.status_code(), expected);
    }

    #[rstest]
    fn only_internal_and_bad_gateway_are_unexpected() {
        let unexpected: Vec<ErrorKind> = ErrorKind::ALL
            .into_iter()
            .filter(|kind| !kind.is_expected())
            .collect();
        assert_eq!(unexpected, vec![ErrorKind::BadGateway, ErrorKind::Internal]);
    }

    #[rstest]
    fn display_includes_kind_and_message() {
        let error = ErrorInfo::conflict("E-mail already registered.");
        assert_eq!(error.to_string(), "conflict: E-mail already registered.");
    }

    #[rstest]
    fn merge_flattens_previous_merges() {
        let merged = ErrorInfo::validation("a")
            .merge(ErrorInfo::validation("b"))
            .merge(ErrorInfo::validation("c"));
        assert_eq!(merged.details(), ["a", "b", "c"]);
        assert_eq!(merged.message(), "a; b; c");
        assert!(merged.is(ErrorKind::Validation));
    }

    #[rstest]
    fn from_panic_reads_string_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let error = ErrorInfo::from_panic(payload.as_ref());
        assert_eq!(error.kind(), ErrorKind::Internal);
        assert!(!error.is_expected());
        assert!(error.message().contains("boom"));
    }

    #[rstest]
    fn problem_copies_status_and_details() {
        let error = ErrorInfo::validation("x").merge(ErrorInfo::validation("y"));
        let problem = Problem::from(&error);
        assert_eq!(problem.status, 400);
        assert_eq!(problem.errors, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(problem.title, "Validation failed");
    }
}
