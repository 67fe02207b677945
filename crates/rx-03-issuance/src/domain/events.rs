//! Events mirrored to the optional remote store.

use rx_02_block_ledger::{BlockId, PrescriptionId};
use serde::{Deserialize, Serialize};

/// Fire-and-forget ledger event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LedgerEvent {
    /// A block was imported.
    #[serde(rename_all = "camelCase")]
    BlockImported {
        /// Normalized serial prefix.
        prefix: String,
        /// Number of forms.
        capacity: u32,
    },
    /// A serial was committed.
    #[serde(rename_all = "camelCase")]
    SerialIssued {
        /// Source block.
        block_id: BlockId,
        /// Committed serial.
        serial: String,
    },
    /// The prescription carrying a serial was signed and recorded.
    #[serde(rename_all = "camelCase")]
    SerialSigned {
        /// Signed serial.
        serial: String,
        /// Prescription record.
        prescription_id: PrescriptionId,
    },
}

impl LedgerEvent {
    /// Event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::BlockImported { .. } => "BlockImported",
            LedgerEvent::SerialIssued { .. } => "SerialIssued",
            LedgerEvent::SerialSigned { .. } => "SerialSigned",
        }
    }
}
