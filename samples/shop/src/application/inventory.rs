//! Inventory use cases.

use storefront::prelude::*;
use uuid::Uuid;

use super::ShopPipeline;
use crate::domain::inventory::StockItem;

/// Adds `delta` units of stock to a variant. Stock never goes negative.
pub fn adjust_stock(variant_id: Uuid, delta: i64) -> ShopPipeline<StockItem> {
    get_update_entity(
        move |item: &StockItem| item.variant_id == variant_id,
        ErrorInfo::not_found(format!("No stock record exists for variant {variant_id}.")),
        QueryOptions::new(),
        [Transition::pure(move |item: StockItem| item.adjust(delta))],
    )
}

/// Reads the stock of one variant.
pub fn get_stock(variant_id: Uuid) -> ShopPipeline<StockItem> {
    get_entity(
        move |item: &StockItem| item.variant_id == variant_id,
        ErrorInfo::not_found(format!("No stock record exists for variant {variant_id}.")),
        QueryOptions::new().as_no_tracking(),
    )
}
