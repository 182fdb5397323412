//! The persistence context seam.

use futures::future::BoxFuture;

use crate::outcome::Fin;
use crate::query::{QueryOptions, Slice};

use super::entity::{AuditStamp, Entity, EventRecord};
use super::tracker::SaveSummary;

/// A request-scoped unit of work over a persistent store.
///
/// A context is a cheap handle: clones share the same staged changes, and
/// pipeline steps receive clones of it. Exactly one transaction owns a
/// context; it is not meant to be driven by two pipelines at once.
///
/// Queries return `'static` futures so that steps can hold them across
/// suspension points without borrowing the context.
pub trait DataContext: Clone + Send + Sync + 'static {
    /// Loads the rows selected by `options`.
    ///
    /// Rows are resolved against the changes staged in this context first:
    /// staged versions win, staged deletions are hidden and staged inserts
    /// are visible. Tracking queries register the loaded rows as unchanged.
    fn query<E>(&self, options: QueryOptions<E>) -> BoxFuture<'static, Fin<Vec<E>>>
    where
        E: Entity;

    /// Loads the rows selected by `options` together with the filtered
    /// total before paging, in one grouped query.
    fn query_slice<E>(&self, options: QueryOptions<E>) -> BoxFuture<'static, Fin<Slice<E>>>
    where
        E: Entity;

    /// Stages an insert.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when the row is already tracked.
    fn stage_insert<E>(&self, entity: E) -> Fin<()>
    where
        E: Entity;

    /// Stages an update.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` when the row is staged for deletion.
    fn stage_update<E>(&self, entity: E) -> Fin<()>
    where
        E: Entity;

    /// Stages a delete.
    ///
    /// # Errors
    ///
    /// Implementations may reject deletes they cannot track.
    fn stage_delete<E>(&self, entity: E) -> Fin<()>
    where
        E: Entity;

    /// Stamps audit fields on every staged insert and update.
    fn stamp_audit(&self, stamp: &AuditStamp) -> usize;

    /// Commits every staged change atomically.
    fn save_changes(&self) -> BoxFuture<'static, Fin<SaveSummary>>;

    /// Removes the pending events of every tracked aggregate.
    fn drain_events(&self) -> Vec<EventRecord>;

    /// Forgets every staged change.
    fn discard_changes(&self);

    /// Number of staged changes.
    fn pending_changes(&self) -> usize;
}
