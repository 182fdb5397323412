//! Entities, the persistence context seam and its in-memory implementation.
//!
//! Handlers never talk to storage directly. They build pipelines over a
//! [`DataContext`], which stages changes in a request-scoped
//! [`ChangeTracker`]; the transaction runner commits them in one step.
//!
//! [`MemoryStore`] is the committed state shared by every request and
//! [`MemoryContext`] the per-request handle over it.

mod context;
mod entity;
mod memory;
mod tracker;

pub use context::DataContext;
pub use entity::{AuditInfo, AuditStamp, DomainEvent, DomainEvents, Entity, EventRecord};
pub use memory::{MemoryContext, MemoryStore, Tables};
pub use tracker::{ChangeTracker, EntryState, SaveSummary};
