//! Integration events and the in-process outbox.
//!
//! Domain events stay inside the shop. The outbox turns the few that other
//! systems care about into [`IntegrationEvent`]s with a JSON payload, and
//! also accepts events published directly by post-commit hooks.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use storefront::prelude::*;
use storefront::transaction::EventSubscriber;
use tracing::debug;

use crate::domain::cart::CartCheckedOut;
use crate::domain::order::OrderPlaced;
use crate::domain::payment::PaymentCaptured;
use crate::domain::shipment::ShipmentAdvanced;

/// A message published to other systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrationEvent {
    pub name: String,
    pub aggregate: String,
    pub aggregate_id: String,
    pub payload: Value,
}

impl IntegrationEvent {
    /// Builds an event with `payload` serialized to JSON.
    ///
    /// # Errors
    ///
    /// Returns `Internal` when the payload cannot be serialized.
    pub fn new<P>(name: &str, aggregate: &str, aggregate_id: impl Into<String>, payload: &P) -> Fin<Self>
    where
        P: Serialize,
    {
        let payload = serde_json::to_value(payload)
            .map_err(|error| ErrorInfo::internal(format!("Cannot serialize {name}: {error}")))?;
        Ok(Self {
            name: name.to_owned(),
            aggregate: aggregate.to_owned(),
            aggregate_id: aggregate_id.into(),
            payload,
        })
    }
}

/// Converts the domain events that leave the shop. Others yield `None`.
///
/// # Errors
///
/// Returns `Internal` when the payload cannot be serialized.
pub fn to_integration_event(record: &EventRecord) -> Fin<Option<IntegrationEvent>> {
    if let Some(event) = record.downcast_ref::<CartCheckedOut>() {
        return convert(record, event);
    }
    if let Some(event) = record.downcast_ref::<OrderPlaced>() {
        return convert(record, event);
    }
    if let Some(event) = record.downcast_ref::<PaymentCaptured>() {
        return convert(record, event);
    }
    if let Some(event) = record.downcast_ref::<ShipmentAdvanced>() {
        return convert(record, event);
    }
    Ok(None)
}

fn convert<E>(record: &EventRecord, event: &E) -> Fin<Option<IntegrationEvent>>
where
    E: Serialize,
{
    IntegrationEvent::new(record.name(), record.entity, record.entity_id.clone(), event).map(Some)
}

/// Records published integration events in memory.
///
/// Subscribed to the transaction runner it receives every committed domain
/// event; [`IntegrationOutbox::publish`] is the target for post-commit hooks.
#[derive(Clone, Debug, Default)]
pub struct IntegrationOutbox {
    published: Arc<Mutex<Vec<IntegrationEvent>>>,
}

impl IntegrationOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `event` when the returned effect runs.
    pub fn publish(&self, event: IntegrationEvent) -> Effect<Fin<()>> {
        let published = Arc::clone(&self.published);
        Effect::lift_sync(move || {
            debug!(name = %event.name, aggregate_id = %event.aggregate_id, "integration event published");
            published.lock().push(event);
            Ok(())
        })
    }

    /// Everything published so far.
    pub fn published(&self) -> Vec<IntegrationEvent> {
        self.published.lock().clone()
    }

    /// Names of everything published so far.
    pub fn names(&self) -> Vec<String> {
        self.published.lock().iter().map(|event| event.name.clone()).collect()
    }
}

impl EventSubscriber for IntegrationOutbox {
    fn handle(&self, record: &EventRecord) -> Effect<Fin<()>> {
        match to_integration_event(record) {
            Ok(Some(event)) => self.publish(event),
            Ok(None) => Effect::succeed(()),
            Err(error) => Effect::fail(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn record<E: DomainEvent>(event: E) -> EventRecord {
        EventRecord {
            entity: "Cart",
            entity_id: "c-1".to_owned(),
            sequence: 0,
            event: Arc::new(event),
        }
    }

    #[rstest]
    fn checked_out_cart_becomes_integration_event() {
        let event = to_integration_event(&record(CartCheckedOut {
            cart_id: Uuid::nil(),
            total: Decimal::new(1999, 2),
        }))
        .unwrap()
        .unwrap();

        assert_eq!(event.name, "cart.checked_out");
        assert_eq!(event.aggregate, "Cart");
        assert_eq!(event.payload["total"], "19.99");
    }

    #[rstest]
    fn internal_events_stay_inside() {
        let event = crate::domain::cart::ItemAdded {
            cart_id: Uuid::nil(),
            variant_id: Uuid::nil(),
            quantity: 1,
        };
        assert_eq!(to_integration_event(&record(event)), Ok(None));
    }

    #[rstest]
    #[tokio::test]
    async fn publish_runs_only_when_effect_runs() {
        let outbox = IntegrationOutbox::new();
        let pending = outbox.publish(
            IntegrationEvent::new("n", "Order", "o-1", &serde_json::json!({})).unwrap(),
        );
        assert!(outbox.published().is_empty());

        pending.run(CancellationToken::new()).await.unwrap();
        assert_eq!(outbox.names(), vec!["n".to_owned()]);
    }
}
