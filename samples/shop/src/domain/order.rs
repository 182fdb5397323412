//! Orders placed from checked-out carts.

use rust_decimal::Decimal;
use serde::Serialize;
use storefront::prelude::*;
use uuid::Uuid;

use super::cart::{Cart, CartLine, CartStatus};

status_machine! {
    /// Lifecycle of an order.
    pub enum OrderStatus: "order status" {
        unknown: Unknown = 0,
        Pending = 1, "Pending" => [Paid, Cancelled],
        Paid = 2, "Paid" => [Shipped, Refunded],
        Shipped = 3, "Shipped" => [Delivered],
        Delivered = 4, "Delivered" => [Refunded],
        Cancelled = 5, "Cancelled" => [],
        Refunded = 6, "Refunded" => [],
    }
}

/// Raised when an order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderPlaced {
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub total: Decimal,
}

impl DomainEvent for OrderPlaced {
    fn name(&self) -> &'static str {
        "orders.order_placed"
    }
}

/// Raised on every status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStatusChanged {
    pub order_id: Uuid,
    pub from: String,
    pub to: String,
}

impl DomainEvent for OrderStatusChanged {
    fn name(&self) -> &'static str {
        "orders.order_status_changed"
    }
}

/// An order and the cart lines it was placed with.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub customer_id: Uuid,
    pub lines: Vec<CartLine>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub audit: AuditInfo,
    pub events: DomainEvents,
}

impl Order {
    /// Places a pending order from `cart`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` unless the cart is checked out.
    pub fn place(cart: &Cart) -> Fin<Self> {
        if cart.status != CartStatus::CheckedOut {
            return fail(ErrorInfo::invalid_operation(format!(
                "Cannot place an order from a cart that is {}.",
                cart.status
            )));
        }
        let id = Uuid::new_v4();
        let total = cart.total();
        let mut order = Self {
            id,
            cart_id: cart.id,
            customer_id: cart.customer_id,
            lines: cart.lines.clone(),
            total,
            status: OrderStatus::Pending,
            audit: AuditInfo::default(),
            events: DomainEvents::default(),
        };
        order.events.raise(OrderPlaced {
            order_id: id,
            customer_id: cart.customer_id,
            total,
        });
        Ok(order)
    }

    /// Moves the order to `status`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for an illegal transition.
    pub fn change_status(mut self, status: OrderStatus) -> Fin<Self> {
        let from = self.status;
        self.status = from.transition_to(status)?;
        self.events.raise(OrderStatusChanged {
            order_id: self.id,
            from: from.to_string(),
            to: status.to_string(),
        });
        Ok(self)
    }
}

impl Entity for Order {
    type Id = Uuid;
    const NAME: &'static str = "Order";

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
