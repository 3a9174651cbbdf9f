/// Entity base: shared mutable world objects
///
/// Every shared domain object (user, character, zone, area, room, item) is an
/// `Entity<T>`: an identity, a reader/writer lock around its state, and a
/// handle to the backing store. Accessors hold the read lock only while
/// copying a value out. Mutators hold the write lock, and when the value
/// actually changes they serialize the whole entity and commit it to the
/// store before releasing the lock, so commit order equals mutation order.
///
/// Locks are not reentrant. Calling any accessor or mutator of an entity
/// while already holding that entity's guard deadlocks; acquiring a second
/// entity's lock while holding one is likewise forbidden by convention.

use crate::core::store::{Record, Store};
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error};
use uuid::Uuid;

/// Opaque unique identity of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Type tag of an entity, also its collection name in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Character,
    Zone,
    Area,
    Room,
    Item,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::User,
        EntityKind::Character,
        EntityKind::Zone,
        EntityKind::Area,
        EntityKind::Room,
        EntityKind::Item,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Character => "character",
            EntityKind::Zone => "zone",
            EntityKind::Area => "area",
            EntityKind::Room => "room",
            EntityKind::Item => "item",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State carried by a concrete entity type
pub trait EntityData: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EntityKind;
}

/// A shared, lock-protected, store-backed world object
pub struct Entity<T: EntityData> {
    id: EntityId,
    store: Arc<dyn Store>,
    state: RwLock<T>,
}

impl<T: EntityData> Entity<T> {
    /// Create a new entity and commit it to the store immediately
    pub fn create(data: T, store: Arc<dyn Store>) -> Result<Arc<Self>> {
        let entity = Self {
            id: EntityId::new(),
            store,
            state: RwLock::new(data),
        };

        entity.write_lock().mark_modified()?;
        debug!(id = %entity.id, kind = %T::KIND, "Created entity");

        Ok(Arc::new(entity))
    }

    /// Rebuild an entity from a stored record without committing it again
    pub fn restore(record: &Record, store: Arc<dyn Store>) -> Result<Arc<Self>> {
        let data: T = record.decode()?;

        Ok(Arc::new(Self {
            id: record.id,
            store,
            state: RwLock::new(data),
        }))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        T::KIND
    }

    /// Acquire the shared lock; released when the guard drops
    pub fn read_lock(&self) -> RwLockReadGuard<'_, T> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire the exclusive lock; released when the guard drops
    pub fn write_lock(&self) -> EntityWriteGuard<'_, T> {
        EntityWriteGuard {
            entity: self,
            guard: self.state.write().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Copy a value out under the read lock
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.read_lock())
    }

    /// Replace one field, committing only when the value changes
    ///
    /// Returns `Ok(true)` if the field changed and was committed.
    pub fn update<V: PartialEq>(&self, value: V, field: impl FnOnce(&mut T) -> &mut V) -> Result<bool> {
        let mut guard = self.write_lock();
        let slot = field(&mut *guard);

        if *slot == value {
            return Ok(false);
        }

        *slot = value;
        guard.mark_modified()?;
        Ok(true)
    }

    /// Apply an arbitrary change under the write lock
    ///
    /// `change` reports whether it altered the state; only then is the entity
    /// committed.
    pub fn modify(&self, change: impl FnOnce(&mut T) -> bool) -> Result<bool> {
        let mut guard = self.write_lock();

        if !change(&mut *guard) {
            return Ok(false);
        }

        guard.mark_modified()?;
        Ok(true)
    }

    /// Remove the store record of this entity
    pub(crate) fn erase(&self) -> Result<()> {
        debug!(id = %self.id, kind = %T::KIND, "Deleting entity record");
        self.store.delete(T::KIND, self.id)
    }
}

/// Exclusive access to an entity's state
pub struct EntityWriteGuard<'a, T: EntityData> {
    entity: &'a Entity<T>,
    guard: RwLockWriteGuard<'a, T>,
}

impl<T: EntityData> EntityWriteGuard<'_, T> {
    /// Serialize the entity and commit it while the lock is still held
    pub fn mark_modified(&self) -> Result<()> {
        let record = Record::encode(self.entity.id, T::KIND, &*self.guard)?;

        self.entity.store.commit(&record).map_err(|e| {
            error!(id = %self.entity.id, kind = %T::KIND, "Commit failed: {}", e);
            e
        })
    }
}

impl<T: EntityData> Deref for EntityWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: EntityData> DerefMut for EntityWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{MemoryStore, MockStore};
    use crate::error::MudError;
    use std::io::{Error as IoError, ErrorKind};
    use std::thread;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Pair {
        left: u64,
        right: u64,
        label: String,
    }

    impl EntityData for Pair {
        const KIND: EntityKind = EntityKind::Item;
    }

    fn memory_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_create_commits_immediately() {
        let store = memory_store();
        let entity = Entity::create(Pair::default(), store.clone()).unwrap();

        assert_eq!(store.commit_count(), 1);
        assert!(store.get(EntityKind::Item, entity.id()).is_some());
        assert_eq!(entity.kind(), EntityKind::Item);
    }

    #[test]
    fn test_update_commits_changed_value() {
        let store = memory_store();
        let entity = Entity::create(Pair::default(), store.clone()).unwrap();

        let changed = entity.update("lamp".to_string(), |p| &mut p.label).unwrap();

        assert!(changed);
        assert_eq!(store.commit_count(), 2);
        let record = store.get(EntityKind::Item, entity.id()).unwrap();
        assert_eq!(record.decode::<Pair>().unwrap().label, "lamp");
    }

    #[test]
    fn test_noop_update_skips_commit() {
        let store = memory_store();
        let entity = Entity::create(Pair::default(), store.clone()).unwrap();
        entity.update("lamp".to_string(), |p| &mut p.label).unwrap();

        let changed = entity.update("lamp".to_string(), |p| &mut p.label).unwrap();
        let modified = entity.modify(|_| false).unwrap();

        assert!(!changed);
        assert!(!modified);
        assert_eq!(store.commit_count(), 2, "No-op mutations must not commit");
    }

    #[test]
    fn test_commit_failure_is_reported_but_memory_keeps_change() {
        let mut store = MockStore::new();
        let mut calls = 0;
        store.expect_commit().returning(move |record| {
            calls += 1;
            if calls == 1 {
                Ok(())
            } else {
                Err(MudError::Storage {
                    kind: record.kind,
                    id: record.id,
                    source: IoError::new(ErrorKind::Other, "disk full"),
                })
            }
        });

        let entity = Entity::create(Pair::default(), Arc::new(store)).unwrap();
        let result = entity.update(7, |p| &mut p.left);

        assert!(matches!(result, Err(MudError::Storage { .. })));
        assert_eq!(entity.read(|p| p.left), 7);
    }

    #[test]
    fn test_restore_does_not_commit() {
        let store = memory_store();
        let original = Entity::create(
            Pair {
                left: 1,
                right: 1,
                label: "torch".to_string(),
            },
            store.clone(),
        )
        .unwrap();
        let record = store.get(EntityKind::Item, original.id()).unwrap();

        let restored: Arc<Entity<Pair>> = Entity::restore(&record, store.clone()).unwrap();

        assert_eq!(restored.id(), original.id());
        assert_eq!(restored.read(|p| p.label.clone()), "torch");
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn test_write_guard_mark_modified() {
        let store = memory_store();
        let entity = Entity::create(Pair::default(), store.clone()).unwrap();

        {
            let mut guard = entity.write_lock();
            guard.left = 3;
            guard.right = 3;
            guard.mark_modified().unwrap();
        }

        assert_eq!(store.commit_count(), 2);
        assert_eq!(entity.read_lock().right, 3);
    }

    #[test]
    fn test_concurrent_writers_never_expose_partial_writes() {
        let store = memory_store();
        let entity = Entity::create(Pair::default(), store.clone()).unwrap();

        let writers: Vec<_> = (1..=4u64)
            .map(|n| {
                let entity = entity.clone();
                thread::spawn(move || {
                    for i in 0..200u64 {
                        let value = n * 1000 + i;
                        entity
                            .modify(|p| {
                                p.left = value;
                                thread::yield_now();
                                p.right = value;
                                true
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let entity = entity.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let (left, right) = entity.read(|p| (p.left, p.right));
                        assert_eq!(left, right, "Observed a partially applied write");
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        assert_eq!(store.commit_count(), 1 + 4 * 200);
        let stored: Pair = store.get(EntityKind::Item, entity.id()).unwrap().decode().unwrap();
        assert_eq!(stored, entity.read(Pair::clone), "Last commit matches memory");
    }

    #[test]
    fn test_entity_id_parse_and_display() {
        let id = EntityId::new();
        let parsed: EntityId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<EntityId>().is_err());
    }
}
