//! # Inbound Ports (Driving Ports)

use crate::domain::errors::IssuanceError;
use crate::domain::value_objects::ImportRequest;
use async_trait::async_trait;
use rx_02_block_ledger::{Block, BlockId, PatientData, Prescription, PrescriptionId};

/// Issuance workflow API.
#[async_trait]
pub trait IssuanceApi: Send + Sync {
    /// Issue a prescription from the active block.
    ///
    /// The cursor advances only after composition and signing both succeed;
    /// any earlier failure rolls the reservation back and the same serial is
    /// handed out by the next call.
    ///
    /// ## Errors
    ///
    /// - `Validation`: a required patient field is blank
    /// - `NoEligibleBlock`: no active block, or it is exhausted
    /// - `CapacityExhausted`
    /// - `CredentialDecryptionFailure`
    /// - `CompositionFailure` / `SigningFailure`
    async fn issue(&self, patient: PatientData) -> Result<Prescription, IssuanceError>;

    /// Import a block, encrypting its password.
    async fn import_block(&self, request: ImportRequest) -> Result<Block, IssuanceError>;

    /// Form field names of a block's source document.
    async fn inspect_fields(&self, block_id: &BlockId) -> Result<Vec<String>, IssuanceError>;

    /// Share an issued prescription's signed document.
    async fn share_prescription(&self, id: &PrescriptionId) -> Result<(), IssuanceError>;

    /// Open an issued prescription's signed document.
    async fn open_prescription(&self, id: &PrescriptionId) -> Result<(), IssuanceError>;
}
