//! Snapshot persistence for the three locally stored blobs.
//!
//! Each store owns exactly one snapshot and rewrites it after every successful mutation. The
//! repository trait keeps the stores ignorant of where the bytes end up.

use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Storage keys for the independently persisted blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKey {
    Catalog,
    Filters,
    Applications,
}

impl SnapshotKey {
    pub const fn name(self) -> &'static str {
        match self {
            SnapshotKey::Catalog => "country-storage",
            SnapshotKey::Filters => "filter-storage",
            SnapshotKey::Applications => "application-storage",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.name())
    }
}

/// Load/save contract invoked by the stores.
pub trait SnapshotRepository<T>: Send + Sync {
    fn load(&self) -> Result<Option<T>, PersistenceError>;
    fn save(&self, snapshot: &T) -> Result<(), PersistenceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("snapshot io failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("snapshot could not be encoded or decoded: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("snapshot storage unavailable: {0}")]
    Unavailable(String),
}

/// In-process snapshot slot, used by tests and when no data directory is configured.
#[derive(Debug)]
pub struct MemorySnapshots<T> {
    slot: Mutex<Option<T>>,
    saves: AtomicUsize,
}

impl<T> Default for MemorySnapshots<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
            saves: AtomicUsize::new(0),
        }
    }
}

impl<T> MemorySnapshots<T> {
    pub fn seeded(snapshot: T) -> Self {
        Self {
            slot: Mutex::new(Some(snapshot)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl<T: Clone> MemorySnapshots<T> {
    pub fn current(&self) -> Option<T> {
        self.slot.lock().ok().and_then(|guard| guard.clone())
    }
}

impl<T> SnapshotRepository<T> for MemorySnapshots<T>
where
    T: Clone + Send,
{
    fn load(&self) -> Result<Option<T>, PersistenceError> {
        let guard = self
            .slot
            .lock()
            .map_err(|_| PersistenceError::Unavailable("snapshot lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, snapshot: &T) -> Result<(), PersistenceError> {
        let mut guard = self
            .slot
            .lock()
            .map_err(|_| PersistenceError::Unavailable("snapshot lock poisoned".to_string()))?;
        *guard = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// JSON document per key inside a data directory.
#[derive(Debug)]
pub struct JsonFileSnapshots<T> {
    path: PathBuf,
    _snapshot: PhantomData<fn() -> T>,
}

impl<T> JsonFileSnapshots<T> {
    pub fn new(data_dir: impl AsRef<Path>, key: SnapshotKey) -> Self {
        Self {
            path: data_dir.as_ref().join(key.file_name()),
            _snapshot: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl<T> SnapshotRepository<T> for JsonFileSnapshots<T>
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> Result<Option<T>, PersistenceError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };

        let snapshot = serde_json::from_slice(&bytes)?;
        debug!(path = %self.path.display(), "snapshot loaded");
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &T) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, bytes).map_err(|err| self.io_error(err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))?;
        Ok(())
    }
}

/// Memory snapshots whose saves can be switched off, for exercising failed commits.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct SwitchableSnapshots<T> {
    inner: MemorySnapshots<T>,
    refusing: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl<T> Default for SwitchableSnapshots<T> {
    fn default() -> Self {
        Self {
            inner: MemorySnapshots::default(),
            refusing: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

#[cfg(test)]
impl<T: Clone> SwitchableSnapshots<T> {
    pub(crate) fn refuse_saves(&self) {
        self.refusing.store(true, Ordering::SeqCst);
    }

    pub(crate) fn current(&self) -> Option<T> {
        self.inner.current()
    }
}

#[cfg(test)]
impl<T> SnapshotRepository<T> for SwitchableSnapshots<T>
where
    T: Clone + Send,
{
    fn load(&self) -> Result<Option<T>, PersistenceError> {
        self.inner.load()
    }

    fn save(&self, snapshot: &T) -> Result<(), PersistenceError> {
        if self.refusing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("disk full".to_string()));
        }
        self.inner.save(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn memory_snapshots_count_saves() {
        let snapshots = MemorySnapshots::<Vec<u32>>::default();
        assert!(snapshots.load().expect("load").is_none());

        snapshots.save(&vec![1, 2]).expect("save");
        snapshots.save(&vec![3]).expect("save");

        assert_eq!(snapshots.save_count(), 2);
        assert_eq!(snapshots.current(), Some(vec![3]));
    }

    #[test]
    fn json_snapshots_round_trip_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshots =
            JsonFileSnapshots::<BTreeMap<String, u32>>::new(dir.path(), SnapshotKey::Filters);
        assert!(snapshots.load().expect("missing file is empty").is_none());

        let mut value = BTreeMap::new();
        value.insert("asia".to_string(), 3);
        snapshots.save(&value).expect("save");

        assert!(snapshots.path().ends_with("filter-storage.json"));
        assert_eq!(snapshots.load().expect("load"), Some(value));
    }

    #[test]
    fn json_snapshots_surface_corrupt_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshots = JsonFileSnapshots::<Vec<u32>>::new(dir.path(), SnapshotKey::Catalog);
        fs::write(snapshots.path(), b"{not json").expect("write");

        assert!(matches!(
            snapshots.load(),
            Err(PersistenceError::Serialization(_))
        ));
    }

    #[test]
    fn switchable_snapshots_keep_the_last_saved_value() {
        let snapshots = SwitchableSnapshots::<Vec<u32>>::default();
        snapshots.save(&vec![1]).expect("save");
        snapshots.refuse_saves();

        assert!(matches!(
            snapshots.save(&vec![2]),
            Err(PersistenceError::Unavailable(_))
        ));
        assert_eq!(snapshots.current(), Some(vec![1]));
    }
}
