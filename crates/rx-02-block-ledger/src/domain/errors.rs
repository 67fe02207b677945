//! # Domain Errors
//!
//! Error types for the Block Ledger subsystem.
//!
//! Each ledger error maps to a failed precondition or a violated invariant;
//! storage-port failures are kept separate in `KVStoreError`.

use super::entities::{BlockId, PrescriptionId};
use thiserror::Error;

/// Errors raised by the registry, the allocator and the prescription log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Malformed import or update parameters.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No block with this id.
    #[error("Block not found: {block_id}")]
    BlockNotFound {
        /// Requested block.
        block_id: BlockId,
    },

    /// A block with this id is already registered.
    #[error("Block already exists: {block_id}")]
    BlockExists {
        /// Conflicting block.
        block_id: BlockId,
    },

    /// `cursor == capacity`: nothing left to reserve.
    #[error("Block {block_id} exhausted: all {capacity} serials issued")]
    CapacityExhausted {
        /// Exhausted block.
        block_id: BlockId,
        /// Its capacity.
        capacity: u32,
    },

    /// Manual cursor override would move below an already issued slot.
    #[error("Cursor {requested} for block {block_id} is below issued slot floor {floor}")]
    CursorBelowJournal {
        /// Target block.
        block_id: BlockId,
        /// Requested cursor (after clamping).
        requested: u32,
        /// Lowest admissible cursor.
        floor: u32,
    },

    /// `update` tried to change a ledger-controlled field.
    #[error("Field '{field}' of block {block_id} is immutable")]
    ImmutableField {
        /// Target block.
        block_id: BlockId,
        /// Offending field.
        field: &'static str,
    },

    /// Reservation no longer matches the block's cursor.
    #[error("Stale reservation for block {block_id}: index {index}, cursor {cursor}")]
    StaleReservation {
        /// Target block.
        block_id: BlockId,
        /// Reserved index.
        index: u32,
        /// Current cursor.
        cursor: u32,
    },

    /// Persisted data violates an invariant; the block is quarantined.
    #[error("Ledger corruption in {scope}: {reason}")]
    LedgerCorruption {
        /// Block id or storage key.
        scope: String,
        /// Violated invariant.
        reason: String,
    },

    /// More than one block is flagged active.
    #[error("Multiple active blocks: {}", block_ids.iter().map(|b| b.as_str()).collect::<Vec<_>>().join(", "))]
    MultipleActive {
        /// Blocks flagged active.
        block_ids: Vec<BlockId>,
    },

    /// Per-block lease could not be acquired in time.
    #[error("Block {block_id} busy: lease not acquired within {waited_ms}ms")]
    BlockBusy {
        /// Contended block.
        block_id: BlockId,
        /// Time waited.
        waited_ms: u64,
    },

    /// No prescription record with this id.
    #[error("Prescription not found: {id}")]
    PrescriptionNotFound {
        /// Requested record.
        id: PrescriptionId,
    },

    /// Storage kept failing after bounded retries.
    #[error("Storage unavailable after {attempts} attempt(s): {message}")]
    StorageUnavailable {
        /// Attempts made.
        attempts: u32,
        /// Last error.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Underlying message.
        message: String,
    },
}

impl LedgerError {
    /// Corruption error scoped to a block.
    pub fn corruption(block_id: &BlockId, reason: impl Into<String>) -> Self {
        LedgerError::LedgerCorruption {
            scope: block_id.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write. Considered transient.
    #[error("KV store I/O error: {message}")]
    Io {
        /// Underlying message.
        message: String,
    },

    /// Stored bytes are unreadable. Not retried.
    #[error("KV store corruption: {message}")]
    Corruption {
        /// Underlying message.
        message: String,
    },

    /// Key contains characters the backend cannot store.
    #[error("Invalid storage key: {key}")]
    InvalidKey {
        /// Offending key.
        key: String,
    },
}

impl KVStoreError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, KVStoreError::Io { .. })
    }
}

impl From<std::io::Error> for KVStoreError {
    fn from(err: std::io::Error) -> Self {
        KVStoreError::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::CapacityExhausted {
            block_id: BlockId::new("blk_a"),
            capacity: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("blk_a"));
        assert!(msg.contains("3 serials"));
    }

    #[test]
    fn test_multiple_active_lists_ids() {
        let err = LedgerError::MultipleActive {
            block_ids: vec![BlockId::new("blk_a"), BlockId::new("blk_b")],
        };
        assert!(err.to_string().contains("blk_a, blk_b"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(KVStoreError::Io {
            message: "disk".to_string()
        }
        .is_transient());
        assert!(!KVStoreError::Corruption {
            message: "bad".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk failure");
        let err: KVStoreError = io.into();
        assert!(matches!(err, KVStoreError::Io { message } if message.contains("disk failure")));
    }
}
