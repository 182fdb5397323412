//! Audit actor and clock sources.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Supplies the identity stamped on committed rows.
///
/// `None` means no identity is available; the runner then falls back to the
/// configured system actor instead of failing.
#[derive(Clone)]
pub struct ActorSource {
    lookup: Arc<dyn Fn() -> Option<String> + Send + Sync>,
}

impl ActorSource {
    /// Always returns `actor`.
    #[must_use]
    pub fn fixed(actor: impl Into<String>) -> Self {
        let actor = actor.into();
        Self::from_fn(move || Some(actor.clone()))
    }

    /// Never knows an identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::from_fn(|| None)
    }

    /// Asks `lookup` on every commit.
    pub fn from_fn<F>(lookup: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
        }
    }

    /// The current identity, if any.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        (self.lookup)()
    }
}

impl Default for ActorSource {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Debug for ActorSource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("ActorSource").finish_non_exhaustive()
    }
}

/// Supplies audit timestamps.
#[derive(Clone)]
pub struct Clock {
    now: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl Clock {
    /// Wall-clock time.
    #[must_use]
    pub fn system() -> Self {
        Self {
            now: Arc::new(Utc::now),
        }
    }

    /// Always returns `at`.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(move || at),
        }
    }

    /// The current time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.now)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Clock").finish_non_exhaustive()
    }
}
