//! The shared key-value store the discovery state lives in.

use crate::discovery::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

pub const FLAG_SET: &[u8] = b"true";
pub const FLAG_CLEAR: &[u8] = b"false";

/// A blob store shared by every instance of the service.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically sets the flag at `key` to `true` if it is absent or `false`.
    ///
    /// Returns whether this caller acquired the flag.
    async fn acquire_flag(&self, key: &str) -> Result<bool, StoreError>;

    async fn clear_flag(&self, key: &str) -> Result<(), StoreError> {
        self.set(key, FLAG_CLEAR).await
    }
}

/// In-process store, for tests and single-instance deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.lock().await.contains_key(key))
    }

    async fn acquire_flag(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(value) if value.as_slice() != FLAG_CLEAR => Ok(false),
            _ => {
                entries.insert(key.to_string(), FLAG_SET.to_vec());
                Ok(true)
            }
        }
    }
}
