//! Payment gateway port and a scripted fake.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use storefront::prelude::*;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// What the shop asks the gateway to capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub payment_id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
}

/// The gateway's confirmation of a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReceipt {
    pub reference: String,
}

/// Failures reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The issuer refused the charge.
    #[error("card declined ({0})")]
    Declined(String),
    /// The gateway timed out or returned garbage.
    #[error("gateway unavailable")]
    Unavailable,
}

impl From<GatewayError> for ErrorInfo {
    fn from(error: GatewayError) -> Self {
        Self::bad_gateway(format!("Payment capture failed: {error}."))
    }
}

/// Captures payments with an external provider.
pub trait PaymentGateway: Send + Sync + fmt::Debug {
    /// Captures `request.amount`.
    fn capture(&self, request: CaptureRequest) -> Effect<Result<GatewayReceipt, GatewayError>>;
}

/// A gateway that approves everything unless a failure is queued.
#[derive(Clone, Debug, Default)]
pub struct FakePaymentGateway {
    scripted: Arc<Mutex<VecDeque<GatewayError>>>,
    captured: Arc<Mutex<Vec<CaptureRequest>>>,
}

impl FakePaymentGateway {
    /// A gateway that approves every capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next capture fail with `error`.
    pub fn fail_next(&self, error: GatewayError) {
        self.scripted.lock().push_back(error);
    }

    /// Every approved capture, in order.
    pub fn captured(&self) -> Vec<CaptureRequest> {
        self.captured.lock().clone()
    }
}

impl PaymentGateway for FakePaymentGateway {
    fn capture(&self, request: CaptureRequest) -> Effect<Result<GatewayReceipt, GatewayError>> {
        let gateway = self.clone();
        Effect::lift_async(move |token| async move {
            if token.is_cancelled() {
                return Err(GatewayError::Unavailable);
            }
            if let Some(error) = gateway.scripted.lock().pop_front() {
                warn!(payment_id = %request.payment_id, %error, "capture rejected");
                return Err(error);
            }
            let reference = format!("cap_{}", request.payment_id.simple());
            info!(payment_id = %request.payment_id, amount = %request.amount, %reference, "capture approved");
            gateway.captured.lock().push(request);
            Ok(GatewayReceipt { reference })
        })
    }
}
