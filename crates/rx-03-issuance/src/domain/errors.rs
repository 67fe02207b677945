//! # Domain Errors
//!
//! Every failure of the issuance workflow surfaces as an `IssuanceError`.
//! Only transient storage I/O is retried, inside the ledger.

use crate::ports::outbound::ComposerError;
use rx_01_credential_vault::VaultError;
use rx_02_block_ledger::{BlockId, DocumentRef, LedgerError, Prescription};
use thiserror::Error;

/// Issuance workflow errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IssuanceError {
    /// Malformed import parameters or missing required patient fields.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No active block, more than one flagged active, or the block was
    /// deactivated while the call waited for it.
    #[error("No eligible block: {reason}")]
    NoEligibleBlock {
        /// Why no block qualifies.
        reason: String,
    },

    /// The active block has no serials left.
    #[error("Block {block_id} exhausted: all {capacity} serials issued")]
    CapacityExhausted {
        /// Exhausted block.
        block_id: BlockId,
        /// Its capacity.
        capacity: u32,
    },

    /// Another issuance held the block longer than the configured wait.
    /// Nothing was reserved.
    #[error("Block {block_id} busy: waited {waited_ms}ms for the issuance ahead")]
    BlockBusy {
        /// Contended block.
        block_id: BlockId,
        /// How long the call waited.
        waited_ms: u64,
    },

    /// Stored credential could not be decrypted; composition blocked.
    #[error("Credential of block {block_id} could not be decrypted; composition blocked")]
    CredentialDecryptionFailure {
        /// Block whose credential failed.
        block_id: BlockId,
    },

    /// Compose/fill step failed. The slot was rolled back.
    #[error("Composition failed for slot {index} of block {block_id}: {source}")]
    CompositionFailure {
        /// Target block.
        block_id: BlockId,
        /// Rolled-back slot.
        index: u32,
        /// Collaborator error.
        #[source]
        source: ComposerError,
    },

    /// Signing step failed. The slot was rolled back.
    #[error("Signing failed for slot {index} of block {block_id}: {source}")]
    SigningFailure {
        /// Target block.
        block_id: BlockId,
        /// Rolled-back slot.
        index: u32,
        /// Collaborator error.
        #[source]
        source: ComposerError,
    },

    /// Persisted data violates an invariant.
    #[error("Ledger corruption in {scope}: {reason}")]
    LedgerCorruption {
        /// Block id or storage key.
        scope: String,
        /// Violated invariant.
        reason: String,
    },

    /// The document was signed but the serial could not be committed.
    ///
    /// The signed document must not be handed out: its serial is not recorded
    /// and will be reserved again.
    #[error("Signed {signed_document} but could not commit serial {serial}: {source}")]
    CommitFailed {
        /// Uncommitted serial.
        serial: String,
        /// Orphaned signed document.
        signed_document: DocumentRef,
        /// Ledger error.
        #[source]
        source: LedgerError,
    },

    /// The serial is committed but the prescription record was not stored.
    #[error("Serial {} committed but prescription record not stored: {source}", prescription.serial)]
    Unrecorded {
        /// The issued prescription.
        prescription: Box<Prescription>,
        /// Ledger error.
        #[source]
        source: LedgerError,
    },

    /// Share/open/inspect call to the collaborator failed.
    #[error("Document service error: {0}")]
    Composer(#[source] ComposerError),

    /// Credential could not be encrypted at import.
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    /// Any other ledger failure.
    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for IssuanceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(message) => IssuanceError::Validation(message),
            LedgerError::CapacityExhausted { block_id, capacity } => {
                IssuanceError::CapacityExhausted { block_id, capacity }
            }
            LedgerError::LedgerCorruption { scope, reason } => {
                IssuanceError::LedgerCorruption { scope, reason }
            }
            LedgerError::BlockBusy {
                block_id,
                waited_ms,
            } => IssuanceError::BlockBusy {
                block_id,
                waited_ms,
            },
            other => IssuanceError::Ledger(other),
        }
    }
}

impl IssuanceError {
    /// Whether the failed attempt left the slot unissued.
    pub fn slot_released(&self) -> bool {
        !matches!(self, IssuanceError::Unrecorded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_errors_lift_into_taxonomy() {
        let err: IssuanceError = LedgerError::CapacityExhausted {
            block_id: BlockId::new("blk_a"),
            capacity: 3,
        }
        .into();
        assert!(matches!(err, IssuanceError::CapacityExhausted { capacity: 3, .. }));

        let err: IssuanceError = LedgerError::Validation("capacity".to_string()).into();
        assert!(matches!(err, IssuanceError::Validation(_)));

        let err: IssuanceError = LedgerError::BlockNotFound {
            block_id: BlockId::new("blk_a"),
        }
        .into();
        assert!(matches!(err, IssuanceError::Ledger(LedgerError::BlockNotFound { .. })));

        let err: IssuanceError = LedgerError::BlockBusy {
            block_id: BlockId::new("blk_a"),
            waited_ms: 300_000,
        }
        .into();
        assert!(matches!(err, IssuanceError::BlockBusy { waited_ms: 300_000, .. }));
    }

    #[test]
    fn test_decryption_failure_message() {
        let err = IssuanceError::CredentialDecryptionFailure {
            block_id: BlockId::new("blk_a"),
        };
        assert!(err.to_string().contains("composition blocked"));
    }
}
