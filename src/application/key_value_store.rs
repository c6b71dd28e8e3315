// Persistence port for string-keyed storage
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failed: {0}")]
    Backend(String),
    #[error("failed to encode store contents: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A string-keyed store. Writes always overwrite the previous value.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// All keys currently held, in no particular order.
    fn keys(&self) -> Vec<String>;
}
