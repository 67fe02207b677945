//! Scriptable `DocumentComposer` for tests.

use crate::domain::value_objects::FormFields;
use crate::ports::outbound::{ComposerError, DocumentComposer};
use async_trait::async_trait;
use parking_lot::Mutex;
use rx_01_credential_vault::Credential;
use rx_02_block_ledger::{DocumentRef, SourceRef};
use std::collections::VecDeque;
use std::time::Duration;

/// One recorded collaborator call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComposerCall {
    ComposeAndFill { page_index: u32, serial: String },
    Sign { document: DocumentRef },
    Share { document: DocumentRef },
    Open { document: DocumentRef },
    PageCount { source: SourceRef },
    ListFields { source: SourceRef },
}

#[derive(Default)]
struct Script {
    compose_failures: VecDeque<ComposerError>,
    sign_failures: VecDeque<ComposerError>,
    compose_delay: Option<Duration>,
    expected_credential: Option<String>,
    page_count: i64,
    fields: Vec<String>,
    calls: Vec<ComposerCall>,
    produced: u64,
}

/// In-memory composer whose failures, delays and outputs are scripted.
pub struct MockDocumentComposer {
    script: Mutex<Script>,
}

impl Default for MockDocumentComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDocumentComposer {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                page_count: 50,
                fields: vec![
                    "patientName".to_string(),
                    "patientDocument".to_string(),
                    "medication".to_string(),
                    "dosage".to_string(),
                    "instructions".to_string(),
                ],
                ..Script::default()
            }),
        }
    }

    /// Fail the next `compose_and_fill` with `error`.
    pub fn fail_next_compose(&self, error: ComposerError) {
        self.script.lock().compose_failures.push_back(error);
    }

    /// Fail the next `sign` with `error`.
    pub fn fail_next_sign(&self, error: ComposerError) {
        self.script.lock().sign_failures.push_back(error);
    }

    /// Delay every `compose_and_fill`.
    pub fn set_compose_delay(&self, delay: Duration) {
        self.script.lock().compose_delay = Some(delay);
    }

    /// Only this password opens the source; anything else is `InvalidCredential`.
    pub fn require_credential(&self, password: impl Into<String>) {
        self.script.lock().expected_credential = Some(password.into());
    }

    /// Page count reported for any source.
    pub fn set_page_count(&self, pages: i64) {
        self.script.lock().page_count = pages;
    }

    /// Field names reported for any source.
    pub fn set_fields(&self, fields: Vec<String>) {
        self.script.lock().fields = fields;
    }

    /// Calls made so far.
    pub fn calls(&self) -> Vec<ComposerCall> {
        self.script.lock().calls.clone()
    }

    /// Number of successfully signed documents.
    pub fn signed_count(&self) -> usize {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ComposerCall::Sign { .. }))
            .count()
    }

    fn check_credential(&self, credential: &Credential) -> Result<(), ComposerError> {
        match &self.script.lock().expected_credential {
            Some(expected) if expected.as_str() != credential.expose() => {
                Err(ComposerError::InvalidCredential)
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentComposer for MockDocumentComposer {
    async fn compose_and_fill(
        &self,
        _source: &SourceRef,
        page_index: u32,
        credential: &Credential,
        fields: &FormFields,
    ) -> Result<DocumentRef, ComposerError> {
        let delay = self.script.lock().compose_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_credential(credential)?;

        let mut script = self.script.lock();
        script.calls.push(ComposerCall::ComposeAndFill {
            page_index,
            serial: fields.serial.clone(),
        });
        if let Some(err) = script.compose_failures.pop_front() {
            return Err(err);
        }
        script.produced += 1;
        Ok(DocumentRef::new(format!(
            "mem://composed/{}/{}",
            script.produced, fields.serial
        )))
    }

    async fn sign(&self, document: &DocumentRef) -> Result<DocumentRef, ComposerError> {
        let mut script = self.script.lock();
        if let Some(err) = script.sign_failures.pop_front() {
            return Err(err);
        }
        script.calls.push(ComposerCall::Sign {
            document: document.clone(),
        });
        Ok(DocumentRef::new(format!("{}.signed", document)))
    }

    async fn share(&self, signed: &DocumentRef) -> Result<(), ComposerError> {
        self.script.lock().calls.push(ComposerCall::Share {
            document: signed.clone(),
        });
        Ok(())
    }

    async fn open(&self, signed: &DocumentRef) -> Result<(), ComposerError> {
        self.script.lock().calls.push(ComposerCall::Open {
            document: signed.clone(),
        });
        Ok(())
    }

    async fn page_count(
        &self,
        source: &SourceRef,
        credential: &Credential,
    ) -> Result<i64, ComposerError> {
        self.check_credential(credential)?;
        let mut script = self.script.lock();
        script.calls.push(ComposerCall::PageCount {
            source: source.clone(),
        });
        Ok(script.page_count)
    }

    async fn list_fields(
        &self,
        source: &SourceRef,
        credential: &Credential,
    ) -> Result<Vec<String>, ComposerError> {
        self.check_credential(credential)?;
        let mut script = self.script.lock();
        script.calls.push(ComposerCall::ListFields {
            source: source.clone(),
        });
        Ok(script.fields.clone())
    }
}
