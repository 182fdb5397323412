//! In-process delivery of drained domain events.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::effect::Effect;
use crate::error::ErrorInfo;
use crate::outcome::Fin;
use crate::persistence::EventRecord;

/// Receives every event of every committed transaction.
///
/// Closures of the right shape are subscribers:
///
/// ```rust
/// use storefront::effect::Effect;
/// use storefront::persistence::EventRecord;
/// use storefront::transaction::EventSubscriber;
///
/// fn accepts(_: impl EventSubscriber) {}
///
/// accepts(|record: &EventRecord| {
///     let name = record.name();
///     Effect::lift_sync(move || {
///         assert!(!name.is_empty());
///         Ok(())
///     })
/// });
/// ```
pub trait EventSubscriber: Send + Sync {
    /// Handles one event. A failure is reported but never rolls back the
    /// commit that produced the event.
    fn handle(&self, record: &EventRecord) -> Effect<Fin<()>>;
}

impl<F> EventSubscriber for F
where
    F: Fn(&EventRecord) -> Effect<Fin<()>> + Send + Sync,
{
    fn handle(&self, record: &EventRecord) -> Effect<Fin<()>> {
        self(record)
    }
}

/// A subscriber failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    /// Name of the event that failed.
    pub event: &'static str,
    /// Its position in the transaction's dispatch order.
    pub sequence: usize,
    /// The subscriber's error.
    pub error: ErrorInfo,
}

/// What one dispatch pass delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Successful subscriber deliveries.
    pub delivered: usize,
    /// Failed subscriber deliveries.
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    /// Whether every delivery succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Delivers events to subscribers in order, each event exactly once per
/// subscriber.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl EventDispatcher {
    /// A dispatcher with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber. Subscribers are called in registration order.
    pub fn subscribe<S>(&mut self, subscriber: S)
    where
        S: EventSubscriber + 'static,
    {
        self.subscribers.push(Arc::new(subscriber));
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Delivers `records` in order to every subscriber.
    pub async fn dispatch(&self, records: &[EventRecord], token: &CancellationToken) -> DispatchReport {
        let mut report = DispatchReport::default();
        for record in records {
            debug!(
                event = record.name(),
                entity = record.entity,
                entity_id = %record.entity_id,
                sequence = record.sequence,
                "dispatching event"
            );
            for subscriber in &self.subscribers {
                match super::guarded(|| subscriber.handle(record))
                    .run(token.clone())
                    .await
                {
                    Ok(()) => report.delivered += 1,
                    Err(error) => {
                        warn!(
                            event = record.name(),
                            sequence = record.sequence,
                            kind = %error.kind(),
                            message = error.message(),
                            "event subscriber failed"
                        );
                        report.failures.push(DispatchFailure {
                            event: record.name(),
                            sequence: record.sequence,
                            error,
                        });
                    }
                }
            }
        }
        report
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("EventDispatcher")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
