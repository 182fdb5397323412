//! Payments against orders.

use rust_decimal::Decimal;
use serde::Serialize;
use storefront::prelude::*;
use uuid::Uuid;

status_machine! {
    /// Lifecycle of a payment.
    pub enum PaymentStatus: "payment status" {
        unknown: Unknown = 0,
        Pending = 1, "Pending" => [Authorized, Captured, Failed],
        Authorized = 2, "Authorized" => [Captured, Failed],
        Captured = 3, "Captured" => [Refunded],
        Failed = 4, "Failed" => [],
        Refunded = 5, "Refunded" => [],
    }
}

/// Raised when the gateway confirms a capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentCaptured {
    pub payment_id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub reference: String,
}

impl DomainEvent for PaymentCaptured {
    fn name(&self) -> &'static str {
        "payments.payment_captured"
    }
}

/// The payment for one order.
#[derive(Debug, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub audit: AuditInfo,
    pub events: DomainEvents,
}

impl Payment {
    /// A pending payment for `amount`.
    pub fn pending(order_id: Uuid, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            amount,
            status: PaymentStatus::Pending,
            reference: None,
            audit: AuditInfo::default(),
            events: DomainEvents::default(),
        }
    }

    /// Records a successful capture with the gateway's reference.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` unless the payment is pending or
    /// authorized.
    pub fn capture(mut self, reference: String) -> Fin<Self> {
        self.status = self.status.transition_to(PaymentStatus::Captured)?;
        self.events.raise(PaymentCaptured {
            payment_id: self.id,
            order_id: self.order_id,
            amount: self.amount,
            reference: reference.clone(),
        });
        self.reference = Some(reference);
        Ok(self)
    }
}

impl Entity for Payment {
    type Id = Uuid;
    const NAME: &'static str = "Payment";

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
