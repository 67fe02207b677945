//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the Block Ledger.
//!
//! Production: `FileKVStore` (adapters/storage/file.rs)
//! Testing: `InMemoryKVStore` (adapters/storage/memory.rs)

use crate::domain::entities::Timestamp;
use crate::domain::errors::KVStoreError;
use async_trait::async_trait;

/// Abstract interface for the device-local key-value store.
///
/// Values are opaque bytes; the ledger writes full JSON replacement values,
/// never incremental patches.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Replace the value stored under `key`.
    ///
    /// ## Atomicity
    ///
    /// After a crash the key holds either the previous value or `value`,
    /// never a mix.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), KVStoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), KVStoreError>;

    /// All stored keys, sorted.
    async fn keys(&self) -> Result<Vec<String>, KVStoreError>;
}

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> Timestamp;
}

/// Default time source using system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }
}
