//! Request-scoped change tracking.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::ErrorInfo;
use crate::outcome::Fin;

use super::entity::{AuditStamp, Entity, EventRecord};
use super::memory::Tables;

/// The staged state of one tracked row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Loaded and not changed since.
    Unchanged,
    /// Staged for insertion.
    Added,
    /// Staged for update.
    Modified,
    /// Staged for deletion.
    Deleted,
}

/// Counts of rows written by one commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Inserted rows.
    pub inserted: usize,
    /// Updated rows.
    pub updated: usize,
    /// Deleted rows.
    pub deleted: usize,
}

impl SaveSummary {
    /// Total rows written.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

trait TrackedEntry: Send + Sync {
    fn state(&self) -> EntryState;
    fn set_state(&mut self, state: EntryState);
    fn stamp(&mut self, stamp: &AuditStamp) -> bool;
    fn check(&self, tables: &Tables) -> Fin<()>;
    fn apply(&self, tables: &mut Tables) -> Fin<()>;
    fn drain_into(&mut self, records: &mut Vec<EventRecord>);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Tracked<E> {
    entity: E,
    state: EntryState,
}

impl<E> TrackedEntry for Tracked<E>
where
    E: Entity,
{
    fn state(&self) -> EntryState {
        self.state
    }

    fn set_state(&mut self, state: EntryState) {
        self.state = state;
    }

    fn stamp(&mut self, stamp: &AuditStamp) -> bool {
        let state = self.state;
        match (state, self.entity.audit_mut()) {
            (EntryState::Added, Some(audit)) => {
                audit.stamp_created(stamp);
                true
            }
            (EntryState::Modified, Some(audit)) => {
                audit.stamp_updated(stamp);
                true
            }
            _ => false,
        }
    }

    fn check(&self, tables: &Tables) -> Fin<()> {
        let id = self.entity.id();
        let exists = tables.find::<E>(&id).is_some();
        match self.state {
            EntryState::Added if exists => Err(ErrorInfo::conflict(format!(
                "{} '{id}' already exists.",
                E::NAME
            ))),
            EntryState::Modified | EntryState::Deleted if !exists => Err(ErrorInfo::conflict(
                format!("{} '{id}' was removed by another transaction.", E::NAME),
            )),
            _ => Ok(()),
        }
    }

    fn apply(&self, tables: &mut Tables) -> Fin<()> {
        let rows = tables.rows_mut::<E>()?;
        let id = self.entity.id();
        match self.state {
            EntryState::Unchanged => {}
            EntryState::Added => rows.push(persisted(&self.entity)),
            EntryState::Modified => {
                if let Some(row) = rows.iter_mut().find(|row| row.id() == id) {
                    *row = persisted(&self.entity);
                }
            }
            EntryState::Deleted => rows.retain(|row| row.id() != id),
        }
        Ok(())
    }

    fn drain_into(&mut self, records: &mut Vec<EventRecord>) {
        let entity_id = self.entity.id().to_string();
        let Some(events) = self.entity.events_mut() else {
            return;
        };
        for event in events.drain() {
            records.push(EventRecord {
                entity: E::NAME,
                entity_id: entity_id.clone(),
                sequence: records.len(),
                event,
            });
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// Rows are written without pending events or loaded navigations.
fn persisted<E>(entity: &E) -> E
where
    E: Entity,
{
    let mut row = entity.clone();
    if let Some(events) = row.events_mut() {
        events.clear();
    }
    row.clear_navigations();
    row
}

type Key = (TypeId, String);

fn key_of<E>(entity: &E) -> Key
where
    E: Entity,
{
    (TypeId::of::<E>(), entity.id().to_string())
}

/// Staged inserts, updates and deletes of one request.
///
/// Entries keep the order in which they were first tracked; events are
/// drained in that order.
#[derive(Default)]
pub struct ChangeTracker {
    entries: Vec<Option<Box<dyn TrackedEntry>>>,
    index: HashMap<Key, usize>,
}

impl ChangeTracker {
    /// An empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a loaded row as unchanged unless it is already tracked.
    pub fn attach<E>(&mut self, entity: &E)
    where
        E: Entity,
    {
        let key = key_of(entity);
        if !self.index.contains_key(&key) {
            self.push(key, entity.clone(), EntryState::Unchanged);
        }
    }

    /// Stages `entity` for insertion.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when a row with the same id is already tracked and
    /// not deleted.
    pub fn stage_insert<E>(&mut self, entity: E) -> Fin<()>
    where
        E: Entity,
    {
        let key = key_of(&entity);
        match self.state_of(&key) {
            None => {
                self.push(key, entity, EntryState::Added);
                Ok(())
            }
            Some(EntryState::Deleted) => self.replace(&key, entity, EntryState::Modified),
            Some(_) => Err(ErrorInfo::conflict(format!(
                "{} '{}' is already tracked.",
                E::NAME,
                key.1
            ))),
        }
    }

    /// Stages `entity` for update.
    ///
    /// A row that is still staged for insertion stays an insertion.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` when the row is staged for deletion.
    pub fn stage_update<E>(&mut self, entity: E) -> Fin<()>
    where
        E: Entity,
    {
        let key = key_of(&entity);
        match self.state_of(&key) {
            None => {
                self.push(key, entity, EntryState::Modified);
                Ok(())
            }
            Some(EntryState::Added) => self.replace(&key, entity, EntryState::Added),
            Some(EntryState::Unchanged | EntryState::Modified) => {
                self.replace(&key, entity, EntryState::Modified)
            }
            Some(EntryState::Deleted) => Err(ErrorInfo::invalid_operation(format!(
                "{} '{}' is marked for deletion.",
                E::NAME,
                key.1
            ))),
        }
    }

    /// Stages `entity` for deletion. Deleting a staged insertion detaches it.
    ///
    /// # Errors
    ///
    /// Returns `Internal` only if the tracker's bookkeeping is inconsistent.
    pub fn stage_delete<E>(&mut self, entity: E) -> Fin<()>
    where
        E: Entity,
    {
        let key = key_of(&entity);
        match self.state_of(&key) {
            None => {
                self.push(key, entity, EntryState::Deleted);
                Ok(())
            }
            Some(EntryState::Added) => {
                if let Some(position) = self.index.remove(&key) {
                    self.entries[position] = None;
                }
                Ok(())
            }
            Some(EntryState::Deleted) => Ok(()),
            Some(EntryState::Unchanged | EntryState::Modified) => {
                self.replace(&key, entity, EntryState::Deleted)
            }
        }
    }

    /// The tracked version of the row with `id`, if any.
    pub fn get<E>(&self, id: &E::Id) -> Option<(&E, EntryState)>
    where
        E: Entity,
    {
        let position = *self.index.get(&(TypeId::of::<E>(), id.to_string()))?;
        let entry = self.entries.get(position)?.as_ref()?;
        let tracked = entry.as_any().downcast_ref::<Tracked<E>>()?;
        Some((&tracked.entity, tracked.state))
    }

    /// Stamps audit fields on every added or modified entry.
    ///
    /// Returns the number of stamped entries.
    pub fn stamp_audit(&mut self, stamp: &AuditStamp) -> usize {
        let mut stamped = 0;
        for entry in self.live_mut() {
            if entry.stamp(stamp) {
                stamped += 1;
            }
        }
        stamped
    }

    /// Resolves committed `rows` of `E` against the staged changes.
    ///
    /// Tracked versions replace their committed rows, rows staged for
    /// deletion are dropped and staged inserts follow the committed rows in
    /// tracking order.
    #[must_use]
    pub fn overlay<E>(&self, rows: Vec<E>) -> Vec<E>
    where
        E: Entity,
    {
        let mut resolved: Vec<E> = rows
            .into_iter()
            .filter_map(|row| match self.get::<E>(&row.id()) {
                Some((_, EntryState::Deleted)) => None,
                Some((tracked, _)) => Some(tracked.clone()),
                None => Some(row),
            })
            .collect();

        let committed: HashSet<String> = resolved.iter().map(|row| row.id().to_string()).collect();
        let staged = self
            .entries
            .iter()
            .flatten()
            .filter_map(|entry| entry.as_any().downcast_ref::<Tracked<E>>())
            .filter(|tracked| tracked.state == EntryState::Added)
            .filter(|tracked| !committed.contains(&tracked.entity.id().to_string()))
            .map(|tracked| tracked.entity.clone());
        resolved.extend(staged);
        resolved
    }

    /// Writes every staged change to `tables`, or nothing.
    ///
    /// Every entry is checked before any is applied. On success the entries
    /// become unchanged and keep their pending events until
    /// [`ChangeTracker::drain_events`].
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when an insert collides with a committed row or an
    /// update or delete targets a row that no longer exists.
    pub fn commit(&mut self, tables: &mut Tables) -> Fin<SaveSummary> {
        for entry in self.live() {
            entry.check(tables)?;
        }

        let mut summary = SaveSummary::default();
        for entry in self.live_mut() {
            entry.apply(tables)?;
            match entry.state() {
                EntryState::Added => summary.inserted += 1,
                EntryState::Modified => summary.updated += 1,
                EntryState::Deleted => summary.deleted += 1,
                EntryState::Unchanged => {}
            }
        }

        for entry in self.entries.iter_mut().flatten() {
            entry.set_state(EntryState::Unchanged);
        }
        Ok(summary)
    }

    /// Removes every pending domain event, in tracking then raise order.
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        let mut records = Vec::new();
        for entry in self.entries.iter_mut().flatten() {
            entry.drain_into(&mut records);
        }
        records
    }

    /// Forgets every tracked entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Number of entries with a staged change.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.live().count()
    }

    fn live(&self) -> impl Iterator<Item = &dyn TrackedEntry> {
        self.entries
            .iter()
            .flatten()
            .map(AsRef::as_ref)
            .filter(|entry| entry.state() != EntryState::Unchanged)
    }

    fn live_mut(&mut self) -> impl Iterator<Item = &mut (dyn TrackedEntry + 'static)> {
        self.entries
            .iter_mut()
            .flatten()
            .map(AsMut::as_mut)
            .filter(|entry| entry.state() != EntryState::Unchanged)
    }

    fn state_of(&self, key: &Key) -> Option<EntryState> {
        let position = *self.index.get(key)?;
        self.entries.get(position)?.as_ref().map(|entry| entry.state())
    }

    fn push<E>(&mut self, key: Key, entity: E, state: EntryState)
    where
        E: Entity,
    {
        self.index.insert(key, self.entries.len());
        self.entries.push(Some(Box::new(Tracked { entity, state })));
    }

    fn replace<E>(&mut self, key: &Key, entity: E, state: EntryState) -> Fin<()>
    where
        E: Entity,
    {
        let tracked = self
            .index
            .get(key)
            .and_then(|position| self.entries.get_mut(*position))
            .and_then(Option::as_mut)
            .and_then(|entry| entry.as_any_mut().downcast_mut::<Tracked<E>>())
            .ok_or_else(|| ErrorInfo::internal(format!("{} tracker entry is corrupt.", E::NAME)))?;
        tracked.entity = entity;
        tracked.state = state;
        Ok(())
    }
}

impl fmt::Debug for ChangeTracker {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ChangeTracker")
            .field("tracked", &self.index.len())
            .field("pending", &self.pending())
            .finish()
    }
}
