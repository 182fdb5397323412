//! Domain layer.
//!
//! Aggregates, their status machines and the events they raise. Nothing in
//! this layer touches the persistence context; every state change is a pure
//! function returning `Fin<Self>`.

pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod identity;
pub mod inventory;
pub mod order;
pub mod payment;
pub mod shipment;

use storefront::prelude::*;

/// Fails with `Validation` when `value` is blank after trimming.
///
/// # Errors
///
/// Returns `Validation` with `message`.
pub fn required(value: &str, message: &str) -> Fin<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fail(ErrorInfo::validation(message))
    } else {
        succeed(trimmed.to_owned())
    }
}
