/// Storage collaborator: persist-or-fail commits keyed by entity id and kind
///
/// Entities commit their full serialized state on every real mutation. The
/// store itself only has to make each single-record write atomic.

use crate::core::entity::{EntityId, EntityKind};
use crate::error::{MudError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Serialized snapshot of one entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: EntityId,
    pub kind: EntityKind,
    pub updated_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl Record {
    pub fn encode<T: Serialize>(id: EntityId, kind: EntityKind, data: &T) -> Result<Self> {
        Ok(Self {
            id,
            kind,
            updated_at: Utc::now(),
            data: serde_json::to_value(data)?,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// Backing store for entities
#[cfg_attr(test, mockall::automock)]
pub trait Store: Send + Sync {
    /// Persist the record, replacing any previous version
    fn commit(&self, record: &Record) -> Result<()>;

    /// Load every record of one kind
    fn load_all(&self, kind: EntityKind) -> Result<Vec<Record>>;

    /// Remove a record; removing a missing record is not an error
    fn delete(&self, kind: EntityKind, id: EntityId) -> Result<()>;
}

/// In-process store, used for tests and throwaway worlds
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(EntityKind, EntityId), Record>>,
    commits: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commits performed so far
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn get(&self, kind: EntityKind, id: EntityId) -> Option<Record> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(kind, id))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn commit(&self, record: &Record) -> Result<()> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((record.kind, record.id), record.clone());
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load_all(&self, kind: EntityKind) -> Result<Vec<Record>> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect())
    }

    fn delete(&self, kind: EntityKind, id: EntityId) -> Result<()> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(kind, id));
        Ok(())
    }
}

/// One JSON document per entity: `<root>/<kind>/<id>.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        for kind in EntityKind::ALL {
            let dir = root.join(kind.as_str());
            fs::create_dir_all(&dir).map_err(|source| MudError::StoreOpen {
                path: dir.display().to_string(),
                source,
            })?;
        }

        info!("Opened JSON store at {}", root.display());
        Ok(Self { root })
    }

    fn record_path(&self, kind: EntityKind, id: EntityId) -> PathBuf {
        self.root.join(kind.as_str()).join(format!("{}.json", id))
    }
}

impl Store for JsonFileStore {
    fn commit(&self, record: &Record) -> Result<()> {
        let path = self.record_path(record.kind, record.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(record)?;

        let storage_err = |source: std::io::Error| MudError::Storage {
            kind: record.kind,
            id: record.id,
            source,
        };

        // Write-then-rename keeps each record whole on disk
        fs::write(&tmp, json).map_err(storage_err)?;
        fs::rename(&tmp, &path).map_err(storage_err)?;

        debug!("Committed {} {}", record.kind, record.id);
        Ok(())
    }

    fn load_all(&self, kind: EntityKind) -> Result<Vec<Record>> {
        let dir = self.root.join(kind.as_str());
        let entries = fs::read_dir(&dir).map_err(|source| MudError::StoreOpen {
            path: dir.display().to_string(),
            source,
        })?;

        let mut records = Vec::new();

        for entry in entries {
            let path = entry?.path();

            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            match fs::read_to_string(&path) {
                Ok(json) => match serde_json::from_str::<Record>(&json) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!("Failed to parse record {:?}: {}", path, e),
                },
                Err(e) => warn!("Failed to read record {:?}: {}", path, e),
            }
        }

        debug!("Loaded {} {} records", records.len(), kind);
        Ok(records)
    }

    fn delete(&self, kind: EntityKind, id: EntityId) -> Result<()> {
        match fs::remove_file(self.record_path(kind, id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MudError::Storage { kind, id, source }),
        }
    }
}
