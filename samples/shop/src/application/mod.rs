//! Application layer: one pipeline per use case.
//!
//! Handlers never commit. They return a [`ShopPipeline`] that the caller
//! runs through a [`TransactionRunner`](storefront::transaction::TransactionRunner),
//! usually via [`Shop`](crate::infrastructure::Shop).

pub mod cart;
pub mod catalog;
pub mod coupons;
pub mod identity;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod shipments;

use storefront::persistence::MemoryContext;
use storefront::pipeline::Pipeline;

/// A handler's pipeline over the shop's persistence context.
pub type ShopPipeline<T> = Pipeline<MemoryContext, T>;
