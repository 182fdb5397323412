//! Inventory: on-hand stock per variant.

use serde::Serialize;
use storefront::prelude::*;
use uuid::Uuid;

/// Raised whenever on-hand stock changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAdjusted {
    pub variant_id: Uuid,
    pub delta: i64,
    pub on_hand: i64,
}

impl DomainEvent for StockAdjusted {
    fn name(&self) -> &'static str {
        "inventory.stock_adjusted"
    }
}

/// Stock of one variant. Keyed by the variant id.
#[derive(Debug, Clone)]
pub struct StockItem {
    pub variant_id: Uuid,
    pub sku: String,
    pub on_hand: i64,
    pub audit: AuditInfo,
    pub events: DomainEvents,
}

impl StockItem {
    /// An empty stock record for a new variant.
    pub fn empty(variant_id: Uuid, sku: impl Into<String>) -> Self {
        Self {
            variant_id,
            sku: sku.into(),
            on_hand: 0,
            audit: AuditInfo::default(),
            events: DomainEvents::default(),
        }
    }

    /// Adds `delta` (which may be negative) to the on-hand quantity.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a zero delta and `InvalidOperation` when the
    /// result would be negative.
    pub fn adjust(mut self, delta: i64) -> Fin<Self> {
        if delta == 0 {
            return fail(ErrorInfo::validation("Stock adjustment must not be zero."));
        }
        let on_hand = self.on_hand.checked_add(delta).filter(|total| *total >= 0).ok_or_else(|| {
            ErrorInfo::invalid_operation(format!(
                "Stock for '{}' cannot go below zero (on hand {}, change {delta}).",
                self.sku, self.on_hand
            ))
        })?;
        self.on_hand = on_hand;
        self.events.raise(StockAdjusted {
            variant_id: self.variant_id,
            delta,
            on_hand,
        });
        Ok(self)
    }
}

impl Entity for StockItem {
    type Id = Uuid;
    const NAME: &'static str = "StockItem";

    fn id(&self) -> Uuid {
        self.variant_id
    }

    fn audit_mut(&mut self) -> Option<&mut AuditInfo> {
        Some(&mut self.audit)
    }

    fn events_mut(&mut self) -> Option<&mut DomainEvents> {
        Some(&mut self.events)
    }
}
