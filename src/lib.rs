//! # storefront
//!
//! A transactional effect pipeline for modular commerce backends.
//!
//! ## Overview
//!
//! Every request handler in a commerce backend repeats the same shape: look up
//! an aggregate, apply fallible domain transitions, run a few asynchronous side
//! effects, then commit everything (or nothing) and publish the events the
//! domain raised. This crate provides that shape as a small set of composable
//! values:
//!
//! - **Outcome**: [`Fin<T>`](outcome::Fin), the railway-oriented result type,
//!   with leftmost-failure-wins combination and an accumulate mode for field
//!   validation
//! - **Effect**: [`Effect<A>`](effect::Effect), a lazily described, cancellable
//!   unit of asynchronous work
//! - **Query shaping**: [`QueryOptions<E>`](query::QueryOptions), an immutable
//!   descriptor of includes, filters, ordering, paging and tracking
//! - **Pipeline**: [`Pipeline<C, T>`](pipeline::Pipeline), an effect bound to a
//!   persistence context with a short-circuiting failure channel
//! - **Entity access**: reusable pipelines in [`access`] for the
//!   read / validate / mutate idiom
//! - **Transactions**: [`TransactionRunner`](transaction::TransactionRunner)
//!   commits atomically, stamps audit fields and dispatches domain events
//! - **Status machines**: [`StatusValue`](status::StatusValue) and the
//!   [`status_machine!`] macro for closed, guarded status enumerations
//!
//! ## Example
//!
//! ```rust
//! use storefront::prelude::*;
//!
//! let total = combine2(succeed(40), succeed(2), |left, right| left + right);
//! assert_eq!(total, Ok(42));
//!
//! let failed: Fin<i32> = combine2(
//!     fail::<i32>(ErrorInfo::validation("left")),
//!     fail::<i32>(ErrorInfo::validation("right")),
//!     |left, right| left + right,
//! );
//! assert_eq!(failed.unwrap_err().message(), "left");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports the types and functions handlers use most.
///
/// # Usage
///
/// ```rust
/// use storefront::prelude::*;
/// ```
pub mod prelude {
    pub use crate::access::{
        AfterInsert, Transition, add_entity, add_entity_with, delete_entity, ensure_absent,
        get_entities, get_entities_with_pagination, get_entity, get_update_entity,
        get_update_entity_async,
    };
    pub use crate::config::PipelineConfig;
    pub use crate::effect::{Effect, ensure_active};
    pub use crate::error::{ErrorInfo, ErrorKind};
    pub use crate::outcome::{
        Fin, FinExt, accumulate, accumulate2, accumulate3, combine2, combine3, combine4, combine5,
        fail, succeed,
    };
    pub use crate::persistence::{
        AuditInfo, DataContext, DomainEvent, DomainEvents, Entity, EventRecord, MemoryContext,
        MemoryStore,
    };
    pub use crate::pipeline::Pipeline;
    pub use crate::query::{IncludeRegistry, Page, PageRequest, QueryOptions, SortDirection, SortKey};
    pub use crate::status::StatusValue;
    pub use crate::transaction::{ActorSource, Clock, Committed, RunState, TransactionRunner};
    pub use crate::{pipeline, status_machine};
    pub use tokio_util::sync::CancellationToken;
}

pub mod access;
pub mod config;
pub mod effect;
pub mod error;
pub mod outcome;
pub mod persistence;
pub mod pipeline;
pub mod query;
pub mod status;
pub mod transaction;

static_assertions::assert_impl_all!(error::ErrorInfo: Send, Sync, Clone);
static_assertions::assert_impl_all!(persistence::MemoryContext: Send, Sync, Clone);
static_assertions::assert_impl_all!(transaction::TransactionRunner: Send, Sync, Clone);
