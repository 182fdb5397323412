//! In-memory committed store and request contexts.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::error::ErrorInfo;
use crate::outcome::Fin;
use crate::query::{QueryOptions, Slice};

use super::context::DataContext;
use super::entity::{AuditStamp, Entity, EventRecord};
use super::tracker::{ChangeTracker, SaveSummary};

// =============================================================================
// Tables
// =============================================================================

/// Committed rows, one table per entity type, in storage order.
#[derive(Default)]
pub struct Tables {
    tables: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Tables {
    /// Every committed row of `E`, in storage order.
    #[must_use]
    pub fn rows<E>(&self) -> &[E]
    where
        E: Entity,
    {
        self.tables
            .get(&TypeId::of::<E>())
            .and_then(|table| table.downcast_ref::<Vec<E>>())
            .map_or(&[], Vec::as_slice)
    }

    /// The committed row of `E` with `id`.
    #[must_use]
    pub fn find<E>(&self, id: &E::Id) -> Option<&E>
    where
        E: Entity,
    {
        self.rows::<E>().iter().find(|row| row.id() == *id)
    }

    pub(crate) fn rows_mut<E>(&mut self) -> Fin<&mut Vec<E>>
    where
        E: Entity,
    {
        self.tables
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Vec::<E>::new()) as Box<dyn Any + Send + Sync>)
            .downcast_mut::<Vec<E>>()
            .ok_or_else(|| ErrorInfo::internal(format!("{} table has the wrong type.", E::NAME)))
    }
}

impl fmt::Debug for Tables {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Tables")
            .field("tables", &self.tables.len())
            .finish()
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

type Loader<E> = Arc<dyn Fn(&mut E, &Tables) -> Fin<()> + Send + Sync>;

struct StoreInner {
    tables: RwLock<Tables>,
    loaders: RwLock<HashMap<(TypeId, String), Box<dyn Any + Send + Sync>>>,
    commits: AtomicU64,
}

/// The shared committed state every request context reads from and commits to.
///
/// Cloning the store clones a handle; all clones see the same data. Commits
/// are serialised under one write lock, so each is atomic with respect to
/// every reader.
///
/// # Examples
///
/// ```rust
/// use storefront::persistence::{Entity, MemoryStore};
///
/// #[derive(Debug, Clone)]
/// struct Tag {
///     id: u32,
/// }
///
/// impl Entity for Tag {
///     type Id = u32;
///     const NAME: &'static str = "Tag";
///
///     fn id(&self) -> u32 {
///         self.id
///     }
/// }
///
/// let store = MemoryStore::new();
/// store.seed([Tag { id: 1 }, Tag { id: 2 }]);
/// assert_eq!(store.snapshot::<Tag>().len(), 2);
/// assert!(store.find::<Tag>(&2).is_some());
/// assert_eq!(store.commit_count(), 0);
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                tables: RwLock::new(Tables::default()),
                loaders: RwLock::new(HashMap::new()),
                commits: AtomicU64::new(0),
            }),
        }
    }

    /// Opens a fresh request context.
    #[must_use]
    pub fn context(&self) -> MemoryContext {
        MemoryContext {
            store: self.clone(),
            tracker: Arc::new(Mutex::new(ChangeTracker::new())),
        }
    }

    /// Registers the eager-load for include `path` of `E`.
    ///
    /// The loader fills the navigation on a row from the committed tables.
    pub fn register_include<E, F>(&self, path: impl Into<String>, loader: F)
    where
        E: Entity,
        F: Fn(&mut E, &Tables) -> Fin<()> + Send + Sync + 'static,
    {
        let loader: Loader<E> = Arc::new(loader);
        self.inner
            .loaders
            .write()
            .insert((TypeId::of::<E>(), path.into()), Box::new(loader));
    }

    /// Inserts rows directly, bypassing tracking, auditing and events.
    pub fn seed<E, I>(&self, rows: I)
    where
        E: Entity,
        I: IntoIterator<Item = E>,
    {
        let mut tables = self.inner.tables.write();
        if let Ok(table) = tables.rows_mut::<E>() {
            table.extend(rows);
        }
    }

    /// A copy of every committed row of `E`.
    #[must_use]
    pub fn snapshot<E>(&self) -> Vec<E>
    where
        E: Entity,
    {
        self.inner.tables.read().rows::<E>().to_vec()
    }

    /// A copy of the committed row of `E` with `id`.
    #[must_use]
    pub fn find<E>(&self, id: &E::Id) -> Option<E>
    where
        E: Entity,
    {
        self.inner.tables.read().find::<E>(id).cloned()
    }

    /// Number of successful commits since the store was created.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.inner.commits.load(Ordering::SeqCst)
    }

    fn loaders_for<E>(&self, paths: &[String]) -> Fin<Vec<Loader<E>>>
    where
        E: Entity,
    {
        let loaders = self.inner.loaders.read();
        paths
            .iter()
            .map(|path| {
                loaders
                    .get(&(TypeId::of::<E>(), path.clone()))
                    .and_then(|loader| loader.downcast_ref::<Loader<E>>())
                    .cloned()
                    .ok_or_else(|| ErrorInfo::validation(format!("Unknown include: {path}")))
            })
            .collect()
    }

    // Staged changes are resolved before includes, filters and paging.
    fn load<E>(&self, options: &QueryOptions<E>, tracker: &ChangeTracker) -> Fin<Slice<E>>
    where
        E: Entity,
    {
        let loaders = self.loaders_for::<E>(options.includes())?;
        let guard = self.inner.tables.read();
        let tables: &Tables = &guard;
        let mut rows = tracker.overlay(tables.rows::<E>().to_vec());
        for row in &mut rows {
            row.clear_navigations();
            for loader in &loaders {
                loader(row, tables)?;
            }
        }
        Ok(options.evaluate(rows))
    }

    fn commit(&self, tracker: &mut ChangeTracker) -> Fin<SaveSummary> {
        let mut tables = self.inner.tables.write();
        let summary = tracker.commit(&mut tables)?;
        self.inner.commits.fetch_add(1, Ordering::SeqCst);
        Ok(summary)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MemoryStore")
            .field("commits", &self.commit_count())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// MemoryContext
// =============================================================================

/// A request-scoped [`DataContext`] over a [`MemoryStore`].
///
/// Clones share the same change tracker, so the clones handed to pipeline
/// steps all stage into the one unit of work.
#[derive(Clone)]
pub struct MemoryContext {
    store: MemoryStore,
    tracker: Arc<Mutex<ChangeTracker>>,
}

impl MemoryContext {
    /// The store this context commits to.
    #[must_use]
    pub const fn store(&self) -> &MemoryStore {
        &self.store
    }

    fn query_slice_now<E>(&self, options: &QueryOptions<E>) -> Fin<Slice<E>>
    where
        E: Entity,
    {
        let mut tracker = self.tracker.lock();
        let slice = self.store.load(options, &tracker)?;
        trace!(plan = %options.plan(), rows = slice.items.len(), total = slice.total, "query");
        if options.is_tracking() {
            for row in &slice.items {
                tracker.attach(row);
            }
        }
        Ok(slice)
    }
}

impl DataContext for MemoryContext {
    fn query<E>(&self, options: QueryOptions<E>) -> BoxFuture<'static, Fin<Vec<E>>>
    where
        E: Entity,
    {
        let context = self.clone();
        async move { context.query_slice_now(&options).map(|slice| slice.items) }.boxed()
    }

    fn query_slice<E>(&self, options: QueryOptions<E>) -> BoxFuture<'static, Fin<Slice<E>>>
    where
        E: Entity,
    {
        let context = self.clone();
        async move { context.query_slice_now(&options) }.boxed()
    }

    fn stage_insert<E>(&self, entity: E) -> Fin<()>
    where
        E: Entity,
    {
        self.tracker.lock().stage_insert(entity)
    }

    fn stage_update<E>(&self, entity: E) -> Fin<()>
    where
        E: Entity,
    {
        self.tracker.lock().stage_update(entity)
    }

    fn stage_delete<E>(&self, entity: E) -> Fin<()>
    where
        E: Entity,
    {
        self.tracker.lock().stage_delete(entity)
    }

    fn stamp_audit(&self, stamp: &AuditStamp) -> usize {
        self.tracker.lock().stamp_audit(stamp)
    }

    fn save_changes(&self) -> BoxFuture<'static, Fin<SaveSummary>> {
        let context = self.clone();
        async move {
            let mut tracker = context.tracker.lock();
            let summary = context.store.commit(&mut tracker)?;
            debug!(
                inserted = summary.inserted,
                updated = summary.updated,
                deleted = summary.deleted,
                "changes saved"
            );
            Ok(summary)
        }
        .boxed()
    }

    fn drain_events(&self) -> Vec<EventRecord> {
        self.tracker.lock().drain_events()
    }

    fn discard_changes(&self) {
        self.tracker.lock().clear();
    }

    fn pending_changes(&self) -> usize {
        self.tracker.lock().pending()
    }
}

impl fmt::Debug for MemoryContext {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MemoryContext")
            .field("tracker", &*self.tracker.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    #[derive(Debug, Clone, PartialEq)]
    struct Parent {
        id: u32,
        children: Vec<Child>,
    }

    impl Entity for Parent {
        type Id = u32;
        const NAME: &'static str = "Parent";

        fn id(&self) -> u32 {
            self.id
        }

        fn clear_navigations(&mut self) {
            self.children.clear();
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Child {
        id: u32,
        parent_id: u32,
    }

    impl Entity for Child {
        type Id = u32;
        const NAME: &'static str = "Child";

        fn id(&self) -> u32 {
            self.id
        }
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.register_include::<Parent, _>("children", |parent, tables| {
            parent.children = tables
                .rows::<Child>()
                .iter()
                .filter(|child| child.parent_id == parent.id)
                .cloned()
                .collect();
            Ok(())
        });
        store.seed([Parent {
            id: 1,
            children: Vec::new(),
        }]);
        store.seed([
            Child { id: 10, parent_id: 1 },
            Child { id: 11, parent_id: 2 },
        ]);
        store
    }

    #[rstest]
    #[tokio::test]
    async fn include_loads_navigation() {
        let context = store().context();
        let rows = context
            .query(QueryOptions::<Parent>::new().add_include("children"))
            .await
            .unwrap();
        assert_eq!(rows[0].children, vec![Child { id: 10, parent_id: 1 }]);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_include_is_rejected() {
        let context = store().context();
        let error = context
            .query(QueryOptions::<Parent>::new().add_include("siblings"))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.message(), "Unknown include: siblings");
    }

    #[rstest]
    #[tokio::test]
    async fn tracking_depends_on_options() {
        let context = store().context();
        context.query(QueryOptions::<Child>::new().as_no_tracking()).await.unwrap();
        assert!(format!("{context:?}").contains("tracked: 0"));

        context.query(QueryOptions::<Child>::new()).await.unwrap();
        assert!(format!("{context:?}").contains("tracked: 2"));
        assert_eq!(context.pending_changes(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn navigations_are_not_persisted() {
        let store = store();
        let context = store.context();
        let mut parent = context
            .query(QueryOptions::<Parent>::new().add_include("children"))
            .await
            .unwrap()
            .remove(0);
        assert_eq!(parent.children.len(), 1);
        parent.children.push(Child { id: 99, parent_id: 1 });
        context.stage_update(parent).unwrap();
        context.save_changes().await.unwrap();

        assert!(store.find::<Parent>(&1).unwrap().children.is_empty());
        assert_eq!(store.commit_count(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn queries_see_changes_staged_in_the_same_context() {
        let context = store().context();
        context
            .stage_insert(Child { id: 12, parent_id: 1 })
            .unwrap();
        context
            .stage_delete(Child { id: 11, parent_id: 2 })
            .unwrap();

        let ids: Vec<u32> = context
            .query(QueryOptions::<Child>::new().as_no_tracking())
            .await
            .unwrap()
            .into_iter()
            .map(|child| child.id)
            .collect();
        assert_eq!(ids, vec![10, 12]);
    }

    #[rstest]
    #[tokio::test]
    async fn staged_updates_replace_committed_rows() {
        let store = store();
        let context = store.context();
        context.stage_update(Child { id: 10, parent_id: 2 }).unwrap();

        let moved = context
            .query(QueryOptions::<Child>::new().add_filter(|child| child.parent_id == 2))
            .await
            .unwrap();
        assert_eq!(moved.len(), 2);
        assert_eq!(store.find::<Child>(&10).unwrap().parent_id, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn discard_forgets_staged_changes() {
        let store = store();
        let context = store.context();
        context
            .stage_insert(Child { id: 12, parent_id: 1 })
            .unwrap();
        context.discard_changes();
        context.save_changes().await.unwrap();
        assert_eq!(store.snapshot::<Child>().len(), 2);
    }
}
