//! Shopping carts.

use rust_decimal::Decimal;
use serde::Serialize;
use storefront::prelude::*;
use uuid::Uuid;

use super::catalog::Variant;
use super::coupon::Coupon;

status_machine! {
    /// Lifecycle of a cart.
    pub enum CartStatus: "cart status" {
        unknown: Unknown = 0,
        Active = 1, "Active" => [CheckedOut, Abandoned],
        CheckedOut = 2, "CheckedOut" => [],
        Abandoned = 3, "Abandoned" => [],
    }
}

// =============================================================================
// Events
// =============================================================================

/// Raised when an item is added or its quantity grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemAdded {
    pub cart_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: u32,
}

impl DomainEvent for ItemAdded {
    fn name(&self) -> &'static str {
        "cart.item_added"
    }
}

/// Raised once, when the cart is checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartCheckedOut {
    pub cart_id: Uuid,
    pub total: Decimal,
}

impl DomainEvent for CartCheckedOut {
    fn name(&self) -> &'static str {
        "cart.checked_out"
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One line of a cart. Prices are captured when the item is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub variant_id: Uuid,
    pub sku: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartLine {
    /// `unit_price * quantity`.
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A customer's cart.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: CartStatus,
    pub lines: Vec<CartLine>,
    pub coupon_code: Option<String>,
    pub discount: Decimal,
    pub audit: AuditInfo,
    pub events: DomainEvents,
}

impl Cart {
    /// An empty active cart.
    pub fn open(customer_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            status: CartStatus::Active,
            lines: Vec::new(),
            coupon_code: None,
            discount: Decimal::ZERO,
            audit: AuditInfo::default(),
            events: DomainEvents::default(),
        }
    }

    /// Sum of every line before discounts.
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Subtotal minus the discount, never below zero.
    pub fn total(&self) -> Decimal {
        (self.subtotal() - self.discount).max(Decimal::ZERO)
    }

    /// Adds `quantity` of `variant`, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a zero quantity or a merged quantity that does
    /// not fit, and `InvalidOperation` unless the cart is active.
    pub fn add_item(mut self, variant: &Variant, quantity: u32) -> Fin<Self> {
        self.ensure_active("add items to")?;
        if quantity == 0 {
            return fail(ErrorInfo::validation("Quantity must be greater than zero."));
        }
        match self.lines.iter_mut().find(|line| line.variant_id == variant.id) {
            Some(line) => {
                line.quantity = line.quantity.checked_add(quantity).ok_or_else(|| {
                    ErrorInfo::validation(format!("Quantity of {} is too large.", line.sku))
                })?;
            }
            None => self.lines.push(CartLine {
                variant_id: variant.id,
                sku: variant.sku.clone(),
                unit_price: variant.price,
                quantity,
            }),
        }
        self.events.raise(ItemAdded {
            cart_id: self.id,
            variant_id: variant.id,
            quantity,
        });
        Ok(self)
    }

    /// Records a redeemed coupon and its discount on the current subtotal.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` unless the cart is active and has no coupon.
    pub fn apply_coupon(mut self, coupon: &Coupon) -> Fin<Self> {
        self.ensure_active("apply a coupon to")?;
        if let Some(existing) = &self.coupon_code {
            return fail(ErrorInfo::invalid_operation(format!(
                "Coupon '{existing}' is already applied to this cart."
            )));
        }
        self.discount = coupon.discount_on(self.subtotal());
        self.coupon_code = Some(coupon.code.clone());
        Ok(self)
    }

    /// Checks the cart out and raises [`CartCheckedOut`] with the total.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` for an empty cart or a cart that is not
    /// active.
    pub fn checkout(mut self) -> Fin<Self> {
        if self.lines.is_empty() {
            return fail(ErrorInfo::invalid_operation("Cannot checkout an empty cart."));
        }
        self.status = self.status.transition_to(CartStatus::CheckedOut)?;
        let total = self.total();
        self.events.raise(CartCheckedOut {
            cart_id: self.id,
            total,
        });
        Ok(self)
    }

    fn ensure_active(&self, action: &str) -> Fin<()> {
        if self.status == CartStatus::Active {
            Ok(())
        } else {
            fail(ErrorInfo::invalid_operation(format!(
                "Cannot {action} a cart that is {}.",
                self.status
            )))
        }
    }
}

impl Entity for Cart {
    type Id = Uuid;
    const NAME: &'static str = "Cart";

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
