//! Shipment use cases.

use storefront::prelude::*;
use uuid::Uuid;

use super::ShopPipeline;
use super::orders::{change_order_status, order_not_found};
use crate::domain::order::{Order, OrderStatus};
use crate::domain::shipment::{Shipment, ShipmentStatus};

pub fn shipment_not_found(shipment_id: Uuid) -> ErrorInfo {
    ErrorInfo::not_found(format!("Shipment {shipment_id} was not found."))
}

/// Starts preparing the shipment of a paid order.
pub fn create_shipment(order_id: Uuid) -> ShopPipeline<Shipment> {
    pipeline! {
        order <= get_entity(
            move |order: &Order| order.id == order_id,
            order_not_found(order_id),
            QueryOptions::new().as_no_tracking(),
        );
        _ <= Pipeline::from_result(if order.status == OrderStatus::Paid {
            Ok(())
        } else {
            Err(ErrorInfo::invalid_operation(format!(
                "Order {order_id} is {} and cannot be shipped.",
                order.status
            )))
        });
        _ <= ensure_absent(
            move |shipment: &Shipment| shipment.order_id == order_id,
            ErrorInfo::conflict(format!("Order {order_id} already has a shipment.")),
        );
        add_entity(Shipment::prepare(order_id))
    }
}

/// Moves a shipment forward and keeps its order's status in step.
pub fn advance_shipment(
    shipment_id: Uuid,
    status: ShipmentStatus,
    tracking_number: Option<String>,
) -> ShopPipeline<Shipment> {
    pipeline! {
        shipment <= get_update_entity(
            move |shipment: &Shipment| shipment.id == shipment_id,
            shipment_not_found(shipment_id),
            QueryOptions::new(),
            [Transition::pure(move |shipment: Shipment| shipment.advance(status, tracking_number))],
        );
        _ <= sync_order(shipment.order_id, status);
        Pipeline::succeed(shipment)
    }
}

fn sync_order(order_id: Uuid, status: ShipmentStatus) -> ShopPipeline<()> {
    match status.order_status() {
        Some(target) => change_order_status(order_id, target).map(|_| ()),
        None => Pipeline::succeed(()),
    }
}
