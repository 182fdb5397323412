//! Shop Sample Application
//!
//! A small modular commerce backend built on `storefront`.
//!
//! # Architecture
//!
//! - **Domain Layer**: aggregates, status machines and domain events
//!   (catalog, inventory, identity, cart, coupons, orders, payments,
//!   shipments)
//! - **Application Layer**: one [`Pipeline`](storefront::pipeline::Pipeline)
//!   per use case, composed from the entity-access combinators
//! - **Infrastructure Layer**: image store and payment gateway adapters,
//!   the integration outbox and the [`Shop`](infrastructure::Shop) container
//!
//! # storefront Features Used
//!
//! - `pipeline!` do-notation and the read / validate / mutate combinators
//! - `status_machine!` for every status-bearing aggregate
//! - `TransactionRunner` for atomic commits and event dispatch
//! - `IncludeRegistry` and `QueryOptions` for product listings

pub mod application;
pub mod domain;
pub mod infrastructure;
