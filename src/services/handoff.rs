//! Inter-step hand-off store.
//!
//! Each pipeline step publishes its output under its own step name and the
//! next step reads it back. Payloads are full serialized copies, so no step
//! ever shares memory with another. Two backends:
//!
//! - [`MemoryHandoff`] for a whole run inside one process
//! - [`FileHandoff`] for steps executed as separate processes, one
//!   `<key>.json` file per slot

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("no payload stored under {0:?}")]
    Missing(String),

    #[error("payload under {key:?} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("hand-off storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait HandoffStore: Send + Sync {
    async fn put(&self, key: &str, payload: serde_json::Value) -> Result<(), HandoffError>;

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, HandoffError>;

    async fn remove(&self, key: &str) -> Result<(), HandoffError>;
}

pub async fn put_typed<T: Serialize + Sync>(
    store: &dyn HandoffStore,
    key: &str,
    value: &T,
) -> Result<(), HandoffError> {
    let payload = serde_json::to_value(value).map_err(|e| HandoffError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.put(key, payload).await
}

/// Read a slot back, treating an absent slot as an error.
pub async fn get_typed<T: DeserializeOwned>(
    store: &dyn HandoffStore,
    key: &str,
) -> Result<T, HandoffError> {
    let payload = store
        .get(key)
        .await?
        .ok_or_else(|| HandoffError::Missing(key.to_string()))?;

    serde_json::from_value(payload).map_err(|e| HandoffError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Clone, Default)]
pub struct MemoryHandoff {
    slots: Arc<DashMap<String, serde_json::Value>>,
}

impl MemoryHandoff {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HandoffStore for MemoryHandoff {
    async fn put(&self, key: &str, payload: serde_json::Value) -> Result<(), HandoffError> {
        self.slots.insert(key.to_string(), payload);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, HandoffError> {
        Ok(self.slots.get(key).map(|entry| entry.value().clone()))
    }

    async fn remove(&self, key: &str) -> Result<(), HandoffError> {
        self.slots.remove(key);
        Ok(())
    }
}

pub struct FileHandoff {
    dir: PathBuf,
}

impl FileHandoff {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl HandoffStore for FileHandoff {
    async fn put(&self, key: &str, payload: serde_json::Value) -> Result<(), HandoffError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let bytes = serde_json::to_vec(&payload).map_err(|e| HandoffError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        // Write-then-rename so a reader never sees half a payload
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, HandoffError> {
        let bytes = match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| HandoffError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn remove(&self, key: &str) -> Result<(), HandoffError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
