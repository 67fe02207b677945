//! Composer used when no document service is attached.

use crate::domain::value_objects::FormFields;
use crate::ports::outbound::{ComposerError, DocumentComposer};
use async_trait::async_trait;
use rx_01_credential_vault::Credential;
use rx_02_block_ledger::{DocumentRef, SourceRef};

/// Message carried by every `OfflineComposer` error.
pub const OFFLINE_MESSAGE: &str = "no document service attached";

/// `DocumentComposer` that refuses every call.
///
/// Lets ledger-only tooling run the workflow's import path. Issuance through
/// it always fails before commit, so the reserved slot is released.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineComposer;

fn offline<T>() -> Result<T, ComposerError> {
    Err(ComposerError::Failed(OFFLINE_MESSAGE.to_string()))
}

#[async_trait]
impl DocumentComposer for OfflineComposer {
    async fn compose_and_fill(
        &self,
        _source: &SourceRef,
        _page_index: u32,
        _credential: &Credential,
        _fields: &FormFields,
    ) -> Result<DocumentRef, ComposerError> {
        offline()
    }

    async fn sign(&self, _document: &DocumentRef) -> Result<DocumentRef, ComposerError> {
        offline()
    }

    async fn share(&self, _signed: &DocumentRef) -> Result<(), ComposerError> {
        offline()
    }

    async fn open(&self, _signed: &DocumentRef) -> Result<(), ComposerError> {
        offline()
    }

    async fn page_count(
        &self,
        _source: &SourceRef,
        _credential: &Credential,
    ) -> Result<i64, ComposerError> {
        offline()
    }

    async fn list_fields(
        &self,
        _source: &SourceRef,
        _credential: &Credential,
    ) -> Result<Vec<String>, ComposerError> {
        offline()
    }
}
