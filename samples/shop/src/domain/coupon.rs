//! Coupons and their redemption rules.

use rust_decimal::Decimal;
use serde::Serialize;
use storefront::prelude::*;
use uuid::Uuid;

status_machine! {
    /// Lifecycle of a coupon.
    pub enum CouponStatus: "coupon status" {
        unknown: Unknown = 0,
        Active = 1, "Active" => [Disabled, Expired, Exhausted],
        Disabled = 2, "Disabled" => [Active],
        Expired = 3, "Expired" => [],
        Exhausted = 4, "Exhausted" => [],
    }
}

/// Raised for every successful redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponRedeemed {
    pub coupon_id: Uuid,
    pub code: String,
    pub redemptions: u32,
}

impl DomainEvent for CouponRedeemed {
    fn name(&self) -> &'static str {
        "coupons.coupon_redeemed"
    }
}

/// A percentage discount code with a redemption limit.
#[derive(Debug, Clone)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub percent_off: u32,
    pub max_redemptions: u32,
    pub redemptions: u32,
    pub status: CouponStatus,
    pub audit: AuditInfo,
    pub events: DomainEvents,
}

impl Coupon {
    /// An active coupon. Codes are stored uppercase.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank code, a percentage outside 1..=100 or
    /// a zero redemption limit.
    pub fn issue(code: &str, percent_off: u32, max_redemptions: u32) -> Fin<Self> {
        let percent = if (1..=100).contains(&percent_off) {
            Ok(percent_off)
        } else {
            fail(ErrorInfo::validation("Discount must be between 1 and 100 percent."))
        };
        let limit = if max_redemptions > 0 {
            Ok(max_redemptions)
        } else {
            fail(ErrorInfo::validation("Redemption limit must be greater than zero."))
        };
        accumulate3(
            super::required(code, "Coupon code is required."),
            percent,
            limit,
            |code, percent_off, max_redemptions| Self {
                id: Uuid::new_v4(),
                code: code.to_uppercase(),
                percent_off,
                max_redemptions,
                redemptions: 0,
                status: CouponStatus::Active,
                audit: AuditInfo::default(),
                events: DomainEvents::default(),
            },
        )
    }

    /// Uses the coupon once. The last allowed redemption exhausts it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` unless the coupon is active.
    pub fn redeem(mut self) -> Fin<Self> {
        if self.status != CouponStatus::Active {
            return fail(ErrorInfo::invalid_operation(format!(
                "Coupon '{}' is {} and cannot be redeemed.",
                self.code, self.status
            )));
        }
        self.redemptions += 1;
        if self.redemptions >= self.max_redemptions {
            self.status = self.status.transition_to(CouponStatus::Exhausted)?;
        }
        self.events.raise(CouponRedeemed {
            coupon_id: self.id,
            code: self.code.clone(),
            redemptions: self.redemptions,
        });
        Ok(self)
    }

    /// The discount this coupon grants on `subtotal`, rounded to cents.
    pub fn discount_on(&self, subtotal: Decimal) -> Decimal {
        (subtotal * Decimal::from(self.percent_off) / Decimal::ONE_HUNDRED).round_dp(2)
    }
}

impl Entity for Coupon {
    type Id = Uuid;
    const NAME: &'static str = "Coupon";

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
