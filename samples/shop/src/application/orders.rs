//! Order use cases.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use storefront::prelude::*;
use uuid::Uuid;

use super::ShopPipeline;
use super::cart::cart_not_found;
use crate::domain::cart::Cart;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::payment::Payment;

pub fn order_not_found(order_id: Uuid) -> ErrorInfo {
    ErrorInfo::not_found(format!("Order {order_id} was not found."))
}

/// Places an order from a checked-out cart, with a pending payment for its
/// total. A cart is ordered at most once.
pub fn place_order(cart_id: Uuid) -> ShopPipeline<Order> {
    pipeline! {
        cart <= get_entity(
            move |cart: &Cart| cart.id == cart_id,
            cart_not_found(cart_id),
            QueryOptions::new().as_no_tracking(),
        );
        _ <= ensure_absent(
            move |order: &Order| order.cart_id == cart_id,
            ErrorInfo::conflict(format!("An order for cart {cart_id} already exists.")),
        );
        order <= Pipeline::from_result(Order::place(&cart));
        _ <= add_entity(Payment::pending(order.id, order.total));
        add_entity(order)
    }
}

/// Moves an order through its lifecycle.
pub fn change_order_status(order_id: Uuid, status: OrderStatus) -> ShopPipeline<Order> {
    get_update_entity(
        move |order: &Order| order.id == order_id,
        order_not_found(order_id),
        QueryOptions::new(),
        [Transition::pure(move |order: Order| order.change_status(status))],
    )
}

/// Reads an order.
pub fn get_order(order_id: Uuid) -> ShopPipeline<Order> {
    get_entity(
        move |order: &Order| order.id == order_id,
        order_not_found(order_id),
        QueryOptions::new().as_no_tracking(),
    )
}

/// A customer's orders, largest total first.
pub fn customer_orders(customer_id: Uuid, request: PageRequest) -> ShopPipeline<Page<Order>> {
    get_entities_with_pagination(
        move |order: &Order| order.customer_id == customer_id,
        QueryOptions::new()
            .add_order_by("total_cents", |order: &Order| {
                (order.total * Decimal::ONE_HUNDRED).round().to_i64().unwrap_or(i64::MAX).into()
            })
            .add_sort_desc()
            .as_no_tracking(),
        request,
        |order| order,
    )
}
