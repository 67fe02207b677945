//! Test doubles shared by unit tests and downstream crates
//! (enable the `test-utils` feature).

use crate::domain::entities::{Block, BlockId, SourceRef, Timestamp};
use crate::domain::errors::KVStoreError;
use crate::domain::journal::Journal;
use crate::domain::serial::SerialScheme;
use crate::ports::outbound::{KeyValueStore, TimeSource};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// Fresh, inactive `Padded` block with nothing issued.
pub fn sample_block(prefix: &str, capacity: u32) -> Block {
    Block {
        id: BlockId::generate(),
        label: format!("{}.pdf", prefix),
        source_ref: SourceRef::new(format!("file:///forms/{}.pdf", prefix)),
        imported_at: Utc::now(),
        serial_prefix: prefix.to_string(),
        serial_scheme: SerialScheme::Padded,
        capacity,
        cursor: 0,
        encrypted_credential: String::new(),
        journal: Journal::new(),
        active: false,
    }
}

/// Clock that only moves when told to.
pub struct FixedTimeSource {
    now: Mutex<Timestamp>,
}

impl FixedTimeSource {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// 2026-02-18 10:00:00 UTC.
    pub fn default_instant() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 2, 18, 10, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Jump to an instant.
    pub fn set(&self, instant: Timestamp) {
        *self.now.lock() = instant;
    }
}

impl Default for FixedTimeSource {
    fn default() -> Self {
        Self::new(Self::default_instant())
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}

/// Store wrapper that fails a scripted number of operations with a
/// transient I/O error before delegating.
pub struct FailingKVStore<KV> {
    inner: KV,
    failing_puts: AtomicU32,
    failing_gets: AtomicU32,
    put_attempts: AtomicU32,
}

impl<KV: KeyValueStore> FailingKVStore<KV> {
    pub fn new(inner: KV) -> Self {
        Self {
            inner,
            failing_puts: AtomicU32::new(0),
            failing_gets: AtomicU32::new(0),
            put_attempts: AtomicU32::new(0),
        }
    }

    /// Fail the next `n` writes.
    pub fn fail_next_puts(&self, n: u32) {
        self.failing_puts.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` reads.
    pub fn fail_next_gets(&self, n: u32) {
        self.failing_gets.store(n, Ordering::SeqCst);
    }

    /// Writes attempted so far, failed ones included.
    pub fn put_attempts(&self) -> u32 {
        self.put_attempts.load(Ordering::SeqCst)
    }

    /// Wrapped store.
    pub fn inner(&self) -> &KV {
        &self.inner
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl<KV: KeyValueStore> KeyValueStore for FailingKVStore<KV> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVStoreError> {
        if Self::take_failure(&self.failing_gets) {
            return Err(KVStoreError::Io {
                message: format!("injected read failure on {}", key),
            });
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), KVStoreError> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_puts) {
            return Err(KVStoreError::Io {
                message: format!("injected write failure on {}", key),
            });
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), KVStoreError> {
        self.inner.delete(key).await
    }

    async fn keys(&self) -> Result<Vec<String>, KVStoreError> {
        self.inner.keys().await
    }
}
