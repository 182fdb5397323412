//! Shipments of paid orders.

use serde::Serialize;
use storefront::prelude::*;
use uuid::Uuid;

use super::order::OrderStatus;

status_machine! {
    /// Lifecycle of a shipment.
    pub enum ShipmentStatus: "shipment status" {
        unknown: Unknown = 0,
        Preparing = 1, "Preparing" => [Shipped],
        Shipped = 2, "Shipped" => [InTransit, Delivered, Returned],
        InTransit = 3, "InTransit" => [Delivered, Returned],
        Delivered = 4, "Delivered" => [Returned],
        Returned = 5, "Returned" => [],
    }
}

impl ShipmentStatus {
    /// The order status a shipment in this status implies, if any.
    pub const fn order_status(self) -> Option<OrderStatus> {
        match self {
            Self::Shipped => Some(OrderStatus::Shipped),
            Self::Delivered => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

/// Raised on every shipment status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentAdvanced {
    pub shipment_id: Uuid,
    pub order_id: Uuid,
    pub status: String,
}

impl DomainEvent for ShipmentAdvanced {
    fn name(&self) -> &'static str {
        "shipments.shipment_advanced"
    }
}

/// A shipment of one order.
#[derive(Debug, Clone)]
pub struct Shipment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: ShipmentStatus,
    pub tracking_number: Option<String>,
    pub audit: AuditInfo,
    pub events: DomainEvents,
}

impl Shipment {
    /// A shipment being prepared.
    pub fn prepare(order_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            status: ShipmentStatus::Preparing,
            tracking_number: None,
            audit: AuditInfo::default(),
            events: DomainEvents::default(),
        }
    }

    /// Moves the shipment to `status`. Shipping requires a tracking number.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for an illegal transition and `Validation`
    /// when shipping without a tracking number.
    pub fn advance(mut self, status: ShipmentStatus, tracking_number: Option<String>) -> Fin<Self> {
        self.status = self.status.transition_to(status)?;
        if let Some(number) = tracking_number {
            self.tracking_number = Some(super::required(&number, "Tracking number is required.")?);
        }
        if status == ShipmentStatus::Shipped && self.tracking_number.is_none() {
            return fail(ErrorInfo::validation("A shipped shipment needs a tracking number."));
        }
        self.events.raise(ShipmentAdvanced {
            shipment_id: self.id,
            order_id: self.order_id,
            status: status.to_string(),
        });
        Ok(self)
    }
}

impl Entity for Shipment {
    type Id = Uuid;
    const NAME: &'static str = "Shipment";

    fn id(&self) -> Uuid {
        self.id
    }

    fn audit_mut(&mut self) -> Option<&mut AuditInfo> {
        Some(&mut self.audit)
    }

    fn events_mut(&mut self) -> Option<&mut DomainEvents> {
        Some(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn shipping_needs_tracking_number() {
        let error = Shipment::prepare(Uuid::new_v4())
            .advance(ShipmentStatus::Shipped, None)
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    #[rstest]
    #[case(ShipmentStatus::Shipped, Some(OrderStatus::Shipped))]
    #[case(ShipmentStatus::InTransit, None)]
    #[case(ShipmentStatus::Delivered, Some(OrderStatus::Delivered))]
    fn shipment_status_maps_to_order_status(#[case] status: ShipmentStatus, #[case] expected: Option<OrderStatus>) {
        assert_eq!(status.order_status(), expected);
    }

    #[rstest]
    fn preparing_cannot_skip_to_delivered() {
        let result = Shipment::prepare(Uuid::new_v4()).advance(ShipmentStatus::Delivered, None);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidOperation);
    }
}
