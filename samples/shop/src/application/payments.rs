//! Payment use cases.

use std::sync::Arc;

use storefront::prelude::*;
use uuid::Uuid;

use super::ShopPipeline;
use super::orders::{change_order_status, order_not_found};
use crate::domain::order::{Order, OrderStatus};
use crate::domain::payment::Payment;
use crate::infrastructure::payment_gateway::{CaptureRequest, GatewayError, GatewayReceipt, PaymentGateway};

/// Captures an order's pending payment through the gateway and marks the
/// order paid.
///
/// The order's status is checked before the gateway is called. A gateway
/// failure is a `BadGateway` and leaves both payment and order untouched.
pub fn capture_payment(order_id: Uuid, gateway: Arc<dyn PaymentGateway>) -> ShopPipeline<Payment> {
    pipeline! {
        order <= get_entity(
            move |order: &Order| order.id == order_id,
            order_not_found(order_id),
            QueryOptions::new().as_no_tracking(),
        );
        _ <= Pipeline::from_result(order.status.can_transition_to(OrderStatus::Paid));
        payment <= get_update_entity_async(
            move |payment: &Payment| payment.order_id == order_id,
            ErrorInfo::not_found(format!("No payment exists for order {order_id}.")),
            QueryOptions::new(),
            [move |payment: Payment| charge(gateway.as_ref(), payment)],
        );
        _ <= change_order_status(order_id, OrderStatus::Paid);
        Pipeline::succeed(payment)
    }
}

fn charge(gateway: &dyn PaymentGateway, payment: Payment) -> Effect<Fin<Payment>> {
    let request = CaptureRequest {
        payment_id: payment.id,
        order_id: payment.order_id,
        amount: payment.amount,
    };
    gateway
        .capture(request)
        .fmap(move |receipt: Result<GatewayReceipt, GatewayError>| -> Fin<Payment> {
            payment.capture(receipt?.reference)
        })
}
