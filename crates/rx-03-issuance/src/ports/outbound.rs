//! # Outbound Ports (Driven Ports)
//!
//! - `DocumentComposer`: the composition & signing collaborator
//! - `SyncRelay`: best-effort mirror of ledger events

use crate::domain::events::LedgerEvent;
use crate::domain::value_objects::FormFields;
use async_trait::async_trait;
use rx_01_credential_vault::Credential;
use rx_02_block_ledger::{DocumentRef, SourceRef};
use thiserror::Error;

/// Errors reported by the document collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposerError {
    /// The source document could not be opened with the given credential.
    #[error("Source document rejected the credential")]
    InvalidCredential,

    /// The source or a produced document does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The collaborator rejected the request.
    #[error("Document service failed: {0}")]
    Failed(String),

    /// The call did not finish in time.
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        /// Operation name.
        operation: &'static str,
        /// Elapsed bound.
        after_ms: u64,
    },

    /// The user navigated away.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Composition & signing collaborator.
///
/// Every call is independent and may fail; the workflow never assumes
/// atomicity across more than one call.
#[async_trait]
pub trait DocumentComposer: Send + Sync {
    /// Extract page `page_index` of the source and fill it.
    async fn compose_and_fill(
        &self,
        source: &SourceRef,
        page_index: u32,
        credential: &Credential,
        fields: &FormFields,
    ) -> Result<DocumentRef, ComposerError>;

    /// Sign a composed document.
    async fn sign(&self, document: &DocumentRef) -> Result<DocumentRef, ComposerError>;

    /// Hand a signed document to the platform share sheet.
    async fn share(&self, signed: &DocumentRef) -> Result<(), ComposerError>;

    /// Open a signed document in a viewer.
    async fn open(&self, signed: &DocumentRef) -> Result<(), ComposerError>;

    /// Number of pages (forms) in the source.
    async fn page_count(
        &self,
        source: &SourceRef,
        credential: &Credential,
    ) -> Result<i64, ComposerError>;

    /// Form field names of the source.
    async fn list_fields(
        &self,
        source: &SourceRef,
        credential: &Credential,
    ) -> Result<Vec<String>, ComposerError>;
}

/// Best-effort event mirror.
///
/// Never blocks or fails the local workflow: implementations swallow and
/// log their own errors.
pub trait SyncRelay: Send + Sync {
    /// Publish an event.
    fn publish(&self, event: LedgerEvent);
}
