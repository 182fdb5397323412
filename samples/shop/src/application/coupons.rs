//! Coupon use cases.

use storefront::prelude::*;

use super::ShopPipeline;
use crate::domain::coupon::Coupon;

/// Issues a new active coupon. Codes are unique, compared uppercase.
pub fn issue_coupon(code: &str, percent_off: u32, max_redemptions: u32) -> ShopPipeline<Coupon> {
    let coupon = Coupon::issue(code, percent_off, max_redemptions);
    pipeline! {
        coupon <= Pipeline::from_result(coupon);
        let code = coupon.code.clone();
        let conflict = ErrorInfo::conflict(format!("Coupon '{code}' already exists."));
        _ <= ensure_absent(move |existing: &Coupon| existing.code == code, conflict);
        add_entity(coupon)
    }
}

/// Redeems the coupon with `code` once.
pub fn redeem(code: &str) -> ShopPipeline<Coupon> {
    let code = code.trim().to_uppercase();
    let not_found = ErrorInfo::not_found(format!("Coupon '{code}' was not found."));
    get_update_entity(
        move |coupon: &Coupon| coupon.code == code,
        not_found,
        QueryOptions::new(),
        [Transition::pure(Coupon::redeem)],
    )
}
