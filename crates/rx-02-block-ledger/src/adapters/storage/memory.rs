use crate::domain::errors::KVStoreError;
use crate::ports::outbound::KeyValueStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory key-value store for unit tests.
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// the ledger wrote, or reopen a ledger over the same data.
#[derive(Clone, Default)]
pub struct InMemoryKVStore {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one value.
    pub fn with_value(key: &str, value: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        store.data.write().insert(key.to_string(), value.into());
        store
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKVStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), KVStoreError> {
        self.data.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KVStoreError> {
        self.data.write().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, KVStoreError> {
        Ok(self.data.read().keys().cloned().collect())
    }
}
