//! # Domain Entities
//!
//! Core entities of the ledger: `Block`, `IssuedEntry` and the `Prescription`
//! record produced by a successful issuance.
//!
//! Field names serialize in camelCase to match the persisted layout of
//! `rx_blocks_v1` and `prescriptions_v1`.

use super::journal::Journal;
use super::serial::SerialScheme;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock timestamp (UTC).
pub type Timestamp = DateTime<Utc>;

/// Opaque block identifier, assigned at import.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(format!("blk_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to a block's source document (e.g. a file URI).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(String);

impl SourceRef {
    /// Wrap a reference.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the reference is blank.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to a document produced by the composition/signing collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRef(String);

impl DocumentRef {
    /// Wrap a handle.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prescription record identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrescriptionId(String);

impl PrescriptionId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(format!("rx_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrescriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One committed issuance, recorded in a block's journal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedEntry {
    /// 0-based slot consumed.
    pub index: u32,
    /// Serial rendered for that slot.
    pub serial: String,
    /// Commit time.
    pub issued_at: Timestamp,
}

/// A block of pre-numbered prescription forms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Immutable identifier.
    pub id: BlockId,
    /// Display name (the imported file's name). The only user-editable field.
    #[serde(default)]
    pub label: String,
    /// Source document reference.
    pub source_ref: SourceRef,
    /// Import time.
    pub imported_at: Timestamp,
    /// Physical stock prefix, e.g. `B2024-001`.
    pub serial_prefix: String,
    /// How serials are rendered from the prefix.
    #[serde(default)]
    pub serial_scheme: SerialScheme,
    /// Number of serials the block can issue.
    pub capacity: u32,
    /// Next unissued index.
    pub cursor: u32,
    /// Vault ciphertext of the source password, or empty.
    #[serde(default)]
    pub encrypted_credential: String,
    /// Committed issuances.
    #[serde(default)]
    pub journal: Journal,
    /// Whether new prescriptions draw from this block.
    #[serde(default)]
    pub active: bool,
}

impl Block {
    /// Serials left before the block is exhausted.
    pub fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.cursor)
    }

    /// `cursor == capacity`: no further reservation possible.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.capacity
    }

    /// Render the serial for a slot of this block.
    pub fn serial_for(&self, index: u32) -> String {
        self.serial_scheme
            .render(&self.serial_prefix, index, self.capacity)
    }

    /// Serial the next reservation would receive, if any.
    pub fn next_serial(&self) -> Option<String> {
        (!self.is_exhausted()).then(|| self.serial_for(self.cursor))
    }

    /// Whether a source password was stored at import.
    pub fn is_protected(&self) -> bool {
        !self.encrypted_credential.is_empty()
    }
}

/// Parameters for importing a new block into the registry.
#[derive(Clone, Debug)]
pub struct NewBlock {
    /// Display name.
    pub label: String,
    /// Source document reference.
    pub source_ref: SourceRef,
    /// Physical stock prefix (normalized at import).
    pub serial_prefix: String,
    /// Serial rendering scheme.
    pub serial_scheme: SerialScheme,
    /// Number of serials.
    pub capacity: u32,
    /// Vault ciphertext of the source password, or empty.
    pub encrypted_credential: String,
}

/// Patient and medication fields filled into a prescription form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientData {
    /// Patient full name (required).
    pub patient_name: String,
    /// Identity document, e.g. `DNI 12345678`.
    #[serde(default)]
    pub patient_document: String,
    /// Birth date as entered.
    #[serde(default)]
    pub patient_birth_date: String,
    /// Medication (required).
    pub medication: String,
    /// Dosage or duration (required).
    pub dosage: String,
    /// Free-text instructions.
    #[serde(default)]
    pub instructions: String,
}

impl PatientData {
    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.patient_name.trim().is_empty() {
            missing.push("patientName");
        }
        if self.medication.trim().is_empty() {
            missing.push("medication");
        }
        if self.dosage.trim().is_empty() {
            missing.push("dosage");
        }
        missing
    }

    /// Copy with surrounding whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            patient_name: self.patient_name.trim().to_string(),
            patient_document: self.patient_document.trim().to_string(),
            patient_birth_date: self.patient_birth_date.trim().to_string(),
            medication: self.medication.trim().to_string(),
            dosage: self.dosage.trim().to_string(),
            instructions: self.instructions.trim().to_string(),
        }
    }
}

/// A signed prescription issued against a block slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    /// Record identifier.
    pub id: PrescriptionId,
    /// Block the serial came from.
    pub block_id: BlockId,
    /// Slot consumed.
    pub index: u32,
    /// Issued serial.
    pub serial: String,
    /// Filled form data.
    pub patient: PatientData,
    /// Commit time of the serial.
    pub issued_at: Timestamp,
    /// Signed document handle.
    pub signed_document: DocumentRef,
}
