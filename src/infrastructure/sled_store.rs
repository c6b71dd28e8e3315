// Durable key-value store backed by sled
use crate::application::key_value_store::{KeyValueStore, StoreError};
use std::path::Path;

/// Writes land in sled's page cache and are flushed to disk in the background.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref()).map_err(backend)?;
        tracing::info!("Opened store {} with {} keys", path.as_ref().display(), db.len());
        Ok(Self { db })
    }

    /// Forces pending writes to disk without blocking the runtime.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let bytes = self.db.flush_async().await.map_err(backend)?;
        tracing::debug!("Flushed {} bytes to store", bytes);
        Ok(())
    }
}

fn backend(e: sled::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.db.get(key) {
            Ok(Some(value)) => Some(String::from_utf8_lossy(&value).into_owned()),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read {} from store: {}", key, e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.db.insert(key, value.as_bytes()).map_err(backend)?;
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.db
            .iter()
            .keys()
            .filter_map(|key| match key {
                Ok(key) => Some(String::from_utf8_lossy(&key).into_owned()),
                Err(e) => {
                    tracing::warn!("Failed to list store keys: {}", e);
                    None
                }
            })
            .collect()
    }
}
