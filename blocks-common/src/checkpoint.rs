use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::policy::{Classify, ErrorPolicy};

/// Enumeration of errors produced by a `CheckpointStore`.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("checkpoint store {} is unavailable: {reason}", .path.display())]
    Unavailable { path: PathBuf, reason: String },
    #[error("failed to persist checkpoint to {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Classify for StoreError {
    fn policy(&self) -> ErrorPolicy {
        match self {
            // Only `load` reports this, and we never start polling from a state we can't read.
            StoreError::Unavailable { .. } => ErrorPolicy::Fatal,
            StoreError::Persistence { .. } => ErrorPolicy::Ignorable,
        }
    }
}

/// Durable home of the poll loop checkpoint.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Return the last persisted checkpoint, or `None` if nothing was ever saved.
    async fn load(&self) -> Result<Option<i64>, StoreError>;

    /// Replace the persisted checkpoint. A later `load` must observe this value even after a crash.
    async fn save(&self, checkpoint: i64) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: CheckpointStore + ?Sized> CheckpointStore for Arc<T> {
    async fn load(&self) -> Result<Option<i64>, StoreError> {
        (**self).load().await
    }

    async fn save(&self, checkpoint: i64) -> Result<(), StoreError> {
        (**self).save(checkpoint).await
    }
}

/// The on-disk state file: the checkpoint plus a snapshot of the settings it was produced with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    pub last_timestamp: i64,
    #[serde(default)]
    pub interval: u64,
    #[serde(default)]
    pub sendgrid_token: String,
    #[serde(default)]
    pub discord_token: String,
    #[serde(default)]
    pub discord_channel_id: String,
}

/// A `CheckpointStore` backed by a JSON file that is rewritten in full on every save.
pub struct FileCheckpointStore {
    path: PathBuf,
    /// Everything but `last_timestamp` is copied from here into every write.
    template: StateFile,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>, template: StateFile) -> Self {
        Self {
            path: path.into(),
            template,
        }
    }

    /// Read and parse the whole state file. A missing file is not an error.
    pub async fn read_state(&self) -> Result<Option<StateFile>, StoreError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(self.unavailable(error.to_string())),
        };

        serde_json::from_slice::<StateFile>(&contents)
            .map(Some)
            .map_err(|error| self.unavailable(error.to_string()))
    }

    fn unavailable(&self, reason: String) -> StoreError {
        StoreError::Unavailable {
            path: self.path.clone(),
            reason,
        }
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Result<Option<i64>, StoreError> {
        let state = self.read_state().await?;

        Ok(state
            .map(|state| state.last_timestamp)
            .filter(|timestamp| *timestamp >= 0))
    }

    async fn save(&self, checkpoint: i64) -> Result<(), StoreError> {
        let state = StateFile {
            last_timestamp: checkpoint,
            ..self.template.clone()
        };

        let path = self.path.clone();
        let result = match serde_json::to_vec_pretty(&state) {
            Ok(contents) => tokio::task::spawn_blocking(move || replace_file(&path, &contents))
                .await
                .map_err(io::Error::other)
                .and_then(|result| result),
            Err(error) => Err(io::Error::new(io::ErrorKind::InvalidData, error)),
        };

        result.map_err(|source| StoreError::Persistence {
            path: self.path.clone(),
            source,
        })?;

        debug!(checkpoint, path = %self.path.display(), "persisted checkpoint");
        Ok(())
    }
}

/// Replace `path` with `contents` so that readers see either the old or the new file, never a mix.
fn replace_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Same directory as the target, rename is only atomic within a filesystem.
    let mut file = NamedTempFile::new_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;

    sync_directory(directory);

    Ok(())
}

/// Flush the rename itself, so the new entry survives a power loss.
#[cfg(unix)]
fn sync_directory(directory: &Path) {
    if let Err(error) = std::fs::File::open(directory).and_then(|dir| dir.sync_all()) {
        warn!("failed to sync checkpoint directory: {}", error);
    }
}

#[cfg(not(unix))]
fn sync_directory(_directory: &Path) {}

/// A `CheckpointStore` that lives in memory. Saves can be made to fail on demand.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    value: Mutex<Option<i64>>,
    saves: Mutex<Vec<i64>>,
    fail_saves: AtomicBool,
}

impl MemoryCheckpointStore {
    pub fn new(initial: Option<i64>) -> Self {
        Self {
            value: Mutex::new(initial),
            ..Default::default()
        }
    }

    /// Make every following `save` fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Every successfully saved value, in order.
    pub fn saved(&self) -> Vec<i64> {
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current(&self) -> Option<i64> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self) -> Result<Option<i64>, StoreError> {
        Ok(self.current())
    }

    async fn save(&self, checkpoint: i64) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Persistence {
                path: PathBuf::from("memory"),
                source: io::Error::other("saves are disabled"),
            });
        }

        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(checkpoint);
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(checkpoint);
        Ok(())
    }
}
