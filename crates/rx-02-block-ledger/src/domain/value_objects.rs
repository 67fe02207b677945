//! # Value Objects
//!
//! Configuration and immutable value types for the Block Ledger.

use super::entities::BlockId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Storage keys of the persisted collections.
pub struct StorageKeys;

impl StorageKeys {
    /// Full JSON array of blocks.
    pub const BLOCKS: &'static str = "rx_blocks_v1";
    /// Full JSON array of prescription records.
    pub const PRESCRIPTIONS: &'static str = "prescriptions_v1";
}

/// Ledger configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Key holding the block collection.
    pub blocks_key: String,
    /// Key holding the prescription log.
    pub prescriptions_key: String,
    /// Attempts per storage operation before `StorageUnavailable`.
    pub storage_retry_attempts: u32,
    /// Delay between storage attempts (doubled each retry).
    pub storage_retry_backoff: Duration,
    /// How long `reserve` waits for a busy block before `BlockBusy`.
    ///
    /// A reservation holds the block until it is committed or rolled back,
    /// so this must outlast the longest hold of the caller queued ahead.
    pub reserve_wait: Duration,
}

/// Default lease wait: two 120 s collaborator calls plus storage retries.
pub const DEFAULT_RESERVE_WAIT: Duration = Duration::from_secs(300);

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            blocks_key: StorageKeys::BLOCKS.to_string(),
            prescriptions_key: StorageKeys::PRESCRIPTIONS.to_string(),
            storage_retry_attempts: 3,
            storage_retry_backoff: Duration::from_millis(50),
            reserve_wait: DEFAULT_RESERVE_WAIT,
        }
    }
}

impl LedgerConfig {
    /// Configuration for tests: no backoff, short lease wait.
    pub fn for_testing() -> Self {
        Self {
            storage_retry_backoff: Duration::ZERO,
            reserve_wait: Duration::from_secs(5),
            ..Self::default()
        }
    }

    /// Set storage retry attempts (at least one).
    pub fn with_storage_retries(mut self, attempts: u32) -> Self {
        self.storage_retry_attempts = attempts.max(1);
        self
    }

    /// Set the retry backoff.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.storage_retry_backoff = backoff;
        self
    }

    /// Set the lease wait.
    pub fn with_reserve_wait(mut self, wait: Duration) -> Self {
        self.reserve_wait = wait;
        self
    }

    /// Total backoff one storage operation may sleep before giving up.
    pub fn storage_retry_budget(&self) -> Duration {
        let mut budget = Duration::ZERO;
        let mut backoff = self.storage_retry_backoff;
        for _ in 1..self.storage_retry_attempts.max(1) {
            budget = budget.saturating_add(backoff);
            backoff = backoff.saturating_mul(2);
        }
        budget
    }
}

/// A block excluded from issuance, with the invariant it violated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantinedBlock {
    /// Quarantined block.
    pub block_id: BlockId,
    /// Violated invariant.
    pub reason: String,
}

/// Aggregate counters over the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    /// Registered blocks (quarantined included).
    pub total_blocks: usize,
    /// Blocks with `cursor == capacity`.
    pub exhausted_blocks: usize,
    /// Blocks that failed invariant checks on load.
    pub quarantined_blocks: usize,
    /// Sum of capacities.
    pub total_capacity: u64,
    /// Sum of cursors.
    pub total_consumed: u64,
    /// Journal entries across all blocks.
    pub total_issued: u64,
    /// Serials left on the active block, if one is active.
    pub active_remaining: Option<u32>,
    /// Prescription records.
    pub prescriptions: usize,
    /// Prescription records issued today (UTC).
    pub prescriptions_today: usize,
}
