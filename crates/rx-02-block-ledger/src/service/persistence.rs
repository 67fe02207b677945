//! Bounded retry around the storage port.
//!
//! Only `KVStoreError::Io` is retried. Unreadable data surfaces immediately
//! as `LedgerCorruption`.

use crate::domain::errors::{KVStoreError, LedgerError};
use crate::domain::value_objects::LedgerConfig;
use crate::ports::outbound::KeyValueStore;
use std::future::Future;

async fn with_retry<T, F, Fut>(
    config: &LedgerConfig,
    key: &str,
    operation: &str,
    mut op: F,
) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, KVStoreError>>,
{
    let attempts = config.storage_retry_attempts.max(1);
    let mut backoff = config.storage_retry_backoff;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                tracing::warn!(
                    key,
                    attempt,
                    "[rx-02] Storage {} failed, retrying: {}",
                    operation,
                    e
                );
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
            }
            Err(KVStoreError::Corruption { message }) => {
                return Err(LedgerError::LedgerCorruption {
                    scope: key.to_string(),
                    reason: message,
                });
            }
            Err(e) => {
                tracing::error!(key, attempt, "[rx-02] Storage {} failed: {}", operation, e);
                return Err(LedgerError::StorageUnavailable {
                    attempts: attempt,
                    message: e.to_string(),
                });
            }
        }
    }

    Err(LedgerError::StorageUnavailable {
        attempts,
        message: format!("{} of '{}' not attempted", operation, key),
    })
}

pub(crate) async fn load<KV: KeyValueStore + ?Sized>(
    kv: &KV,
    key: &str,
    config: &LedgerConfig,
) -> Result<Option<Vec<u8>>, LedgerError> {
    with_retry(config, key, "read", || kv.get(key)).await
}

pub(crate) async fn store<KV: KeyValueStore + ?Sized>(
    kv: &KV,
    key: &str,
    value: &[u8],
    config: &LedgerConfig,
) -> Result<(), LedgerError> {
    with_retry(config, key, "write", || kv.put(key, value)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryKVStore;
    use crate::test_utils::FailingKVStore;

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let kv = FailingKVStore::new(InMemoryKVStore::new());
        kv.fail_next_puts(2);
        let config = LedgerConfig::for_testing().with_storage_retries(3);

        store(&kv, "k", b"v", &config).await.unwrap();
        assert_eq!(load(&kv, "k", &config).await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(kv.put_attempts(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_unavailable() {
        let kv = FailingKVStore::new(InMemoryKVStore::new());
        kv.fail_next_puts(5);
        let config = LedgerConfig::for_testing().with_storage_retries(3);

        let err = store(&kv, "k", b"v", &config).await.unwrap_err();
        assert!(matches!(err, LedgerError::StorageUnavailable { attempts: 3, .. }));
        assert_eq!(load(&kv, "k", &config).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_key_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let kv = crate::adapters::storage::FileKVStore::new(dir.path());
        let config = LedgerConfig::for_testing().with_storage_retries(3);

        let err = store(&kv, "../k", b"v", &config).await.unwrap_err();
        assert!(matches!(err, LedgerError::StorageUnavailable { attempts: 1, .. }));
    }
}
