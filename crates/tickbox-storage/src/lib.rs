//! Persistence adapter for tickbox store state.
//!
//! Reads never fail: an empty, unreadable or malformed record is reported as
//! "nothing persisted" and logged. Writes return errors for the caller to log.

pub mod codec;
pub mod error;
pub mod medium;

use std::path::PathBuf;

use tracing::{debug, info, warn};

pub use codec::{CURRENT_VERSION, PersistedState, decode, encode};
pub use error::{DecodeError, StorageError};
pub use medium::{FileStorage, KeyValueStorage, MediumParseError, MemoryStorage, SessionStorage, StorageMedium};

/// Default key the state is stored under.
pub const DEFAULT_PERSIST_KEY: &str = "tasks";

/// Where and under which key state is persisted.
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Backing medium.
    pub medium: StorageMedium,
    /// Storage key.
    pub key: String,
    /// Directory for [`StorageMedium::Durable`]; the platform data dir when `None`.
    pub dir: Option<PathBuf>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            medium: StorageMedium::default(),
            key: DEFAULT_PERSIST_KEY.to_owned(),
            dir: None,
        }
    }
}

/// Saves and restores [`PersistedState`] through a [`KeyValueStorage`].
pub struct PersistenceAdapter {
    key: String,
    medium: StorageMedium,
    storage: Box<dyn KeyValueStorage>,
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("key", &self.key)
            .field("medium", &self.medium)
            .finish_non_exhaustive()
    }
}

impl PersistenceAdapter {
    /// Open the configured medium.
    ///
    /// When the durable directory cannot be resolved or created, falls back to
    /// a private in-memory medium so the store keeps working for this run.
    #[must_use]
    pub fn open(options: &StorageOptions) -> Self {
        let storage: Box<dyn KeyValueStorage> = match options.medium {
            StorageMedium::Durable => match open_durable(options.dir.clone()) {
                Ok(storage) => Box::new(storage),
                Err(err) => {
                    warn!(key = %options.key, error = %err, "durable storage unavailable, falling back to memory");
                    return Self::with_storage(options.key.clone(), StorageMedium::Memory, MemoryStorage::new());
                }
            },
            StorageMedium::Session => Box::new(SessionStorage),
            StorageMedium::Memory => Box::new(MemoryStorage::new()),
        };
        Self {
            key: options.key.clone(),
            medium: options.medium,
            storage,
        }
    }

    /// Wrap an arbitrary storage implementation.
    pub fn with_storage(key: impl Into<String>, medium: StorageMedium, storage: impl KeyValueStorage + 'static) -> Self {
        Self {
            key: key.into(),
            medium,
            storage: Box::new(storage),
        }
    }

    /// Storage key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Medium actually in use (after any fallback).
    #[must_use]
    pub const fn medium(&self) -> StorageMedium {
        self.medium
    }

    /// Restore persisted state, treating every failure as "nothing persisted".
    #[must_use]
    pub fn load(&self) -> Option<PersistedState> {
        match self.try_load() {
            Ok(Some(state)) => {
                info!(key = %self.key, tasks = state.tasks.len(), "hydrated persisted state");
                Some(state)
            }
            Ok(None) => {
                debug!(key = %self.key, "no persisted state");
                None
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "ignoring unusable persisted state");
                None
            }
        }
    }

    /// Restore persisted state, surfacing failures.
    ///
    /// # Errors
    /// Returns [`StorageError`] when the medium fails or the record is malformed.
    pub fn try_load(&self) -> Result<Option<PersistedState>, StorageError> {
        let Some(raw) = self.storage.get_item(&self.key)? else {
            return Ok(None);
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(codec::decode(&raw)?))
    }

    /// Persist `state`.
    ///
    /// # Errors
    /// Returns [`StorageError`] when encoding or the medium write fails.
    pub fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        let raw = codec::encode(state).map_err(StorageError::Encode)?;
        self.storage.set_item(&self.key, &raw)?;
        debug!(key = %self.key, bytes = raw.len(), "persisted state");
        Ok(())
    }

    /// Delete the persisted record.
    ///
    /// # Errors
    /// Returns [`StorageError`] when the medium fails.
    pub fn remove(&self) -> Result<(), StorageError> {
        self.storage.remove_item(&self.key)
    }
}

fn open_durable(dir: Option<PathBuf>) -> Result<FileStorage, StorageError> {
    let dir = dir
        .or_else(FileStorage::default_dir)
        .ok_or_else(|| StorageError::Unavailable("no platform data directory".into()))?;
    FileStorage::open(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickbox_core::{Filter, Task, TaskName, clock};

    struct BrokenStorage;

    impl KeyValueStorage for BrokenStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }

        fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }
    }

    fn sample_state() -> PersistedState {
        let name = TaskName::new("Buy milk").unwrap_or_else(|| panic!("valid name"));
        PersistedState {
            tasks: vec![Task::new(name, None, clock::now())],
            filter: Filter::Active,
        }
    }

    #[test]
    fn memory_adapter_round_trips() -> Result<(), StorageError> {
        let adapter = PersistenceAdapter::open(&StorageOptions {
            medium: StorageMedium::Memory,
            ..StorageOptions::default()
        });
        assert!(adapter.load().is_none());
        let state = sample_state();
        adapter.save(&state)?;
        assert_eq!(adapter.load(), Some(state));
        adapter.remove()?;
        assert!(adapter.load().is_none());
        Ok(())
    }

    #[test]
    fn broken_medium_reads_as_empty_and_reports_writes() {
        let adapter = PersistenceAdapter::with_storage("tasks", StorageMedium::Durable, BrokenStorage);
        assert!(adapter.load().is_none());
        assert!(adapter.try_load().is_err());
        assert!(matches!(adapter.save(&sample_state()), Err(StorageError::Unavailable(_))));
    }

    #[test]
    fn corrupt_and_blank_records_read_as_empty() -> Result<(), StorageError> {
        let storage = MemoryStorage::new();
        storage.set_item("tasks", "{\"state\":")?;
        let adapter = PersistenceAdapter::with_storage("tasks", StorageMedium::Memory, storage);
        assert!(adapter.load().is_none());
        assert!(matches!(adapter.try_load(), Err(StorageError::Decode(_))));

        let blank = MemoryStorage::new();
        blank.set_item("tasks", "  ")?;
        let adapter = PersistenceAdapter::with_storage("tasks", StorageMedium::Memory, blank);
        assert!(adapter.try_load()?.is_none());
        Ok(())
    }

    #[test]
    fn unusable_durable_dir_falls_back_to_memory() -> Result<(), StorageError> {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file in the way")?;
        let adapter = PersistenceAdapter::open(&StorageOptions {
            medium: StorageMedium::Durable,
            key: "tasks".into(),
            dir: Some(blocker.join("inner")),
        });
        assert_eq!(adapter.medium(), StorageMedium::Memory);
        adapter.save(&sample_state())?;
        assert!(adapter.load().is_some());
        Ok(())
    }
}
