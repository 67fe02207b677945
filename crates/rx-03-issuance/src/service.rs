//! # Issuance Workflow
//!
//! Drives one issuance through the ledger and the document collaborator:
//!
//! ```text
//! active block ─► reserve ─► decrypt ─► compose ─► sign ─► commit ─► record
//!                    │           │          │         │
//!                    └───────────┴──────────┴─────────┴──► rollback on failure
//! ```
//!
//! The durable cursor is only touched by `commit`, after the signed document
//! exists. Dropping an in-flight `issue` future drops its reservation, which
//! releases the block without writing anything.

use crate::domain::errors::IssuanceError;
use crate::domain::events::LedgerEvent;
use crate::domain::value_objects::{FormFields, ImportRequest, IssuanceConfig};
use crate::ports::inbound::IssuanceApi;
use crate::ports::outbound::{ComposerError, DocumentComposer, SyncRelay};
use async_trait::async_trait;
use rx_01_credential_vault::{Credential, CredentialVault};
use rx_02_block_ledger::{
    Block, BlockId, BlockRegistryApi, DocumentRef, KeyValueStore, LedgerError, LedgerService,
    NewBlock, PatientData, Prescription, PrescriptionId, PrescriptionLogApi, SerialAllocatorApi,
};
use std::future::Future;
use std::sync::Arc;

/// The issuance workflow.
///
/// Generic over the composer so the collaborator is fixed at compile time;
/// the relay is a trait object since it is swapped at runtime (offline/online).
pub struct IssuanceWorkflow<KV: KeyValueStore, C: DocumentComposer> {
    ledger: Arc<LedgerService<KV>>,
    vault: CredentialVault,
    composer: Arc<C>,
    relay: Arc<dyn SyncRelay>,
    config: IssuanceConfig,
}

impl<KV: KeyValueStore, C: DocumentComposer> IssuanceWorkflow<KV, C> {
    pub fn new(
        ledger: Arc<LedgerService<KV>>,
        vault: CredentialVault,
        composer: Arc<C>,
        relay: Arc<dyn SyncRelay>,
        config: IssuanceConfig,
    ) -> Self {
        let ledger_config = ledger.registry().config();
        let hold = config.lease_hold_bound(ledger_config);
        if ledger_config.reserve_wait < hold {
            tracing::warn!(
                reserve_wait = ?ledger_config.reserve_wait,
                hold_bound = ?hold,
                "[rx-03] Lease wait shorter than one issuance; queued issues may fail with BlockBusy"
            );
        }
        Self {
            ledger,
            vault,
            composer,
            relay,
            config,
        }
    }

    /// Underlying ledger.
    pub fn ledger(&self) -> &Arc<LedgerService<KV>> {
        &self.ledger
    }

    /// Run a collaborator call under the composition timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, ComposerError>>,
    ) -> Result<T, ComposerError> {
        let limit = self.config.composition_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| {
                Err(ComposerError::Timeout {
                    operation,
                    after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })
            })
    }

    /// Decrypt a block's credential. A non-empty ciphertext that decrypts to
    /// nothing blocks composition; it never means "unprotected".
    fn credential_for(&self, block: &Block) -> Result<Credential, IssuanceError> {
        if !block.is_protected() {
            return Ok(Credential::empty());
        }
        let credential = self.vault.decrypt(&block.encrypted_credential);
        if credential.is_empty() {
            tracing::error!(block_id = %block.id, "[rx-03] Stored credential unusable");
            return Err(IssuanceError::CredentialDecryptionFailure {
                block_id: block.id.clone(),
            });
        }
        Ok(credential)
    }

    async fn eligible_block(&self) -> Result<Block, IssuanceError> {
        let active = match self.ledger.registry().active().await {
            Ok(active) => active,
            Err(LedgerError::MultipleActive { block_ids }) => {
                return Err(IssuanceError::NoEligibleBlock {
                    reason: format!(
                        "{} blocks flagged active; activate one to continue",
                        block_ids.len()
                    ),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let block = active.ok_or_else(|| IssuanceError::NoEligibleBlock {
            reason: "no active block".to_string(),
        })?;
        if block.is_exhausted() {
            return Err(IssuanceError::CapacityExhausted {
                block_id: block.id,
                capacity: block.capacity,
            });
        }
        Ok(block)
    }

    /// Whether `id` is still the active block once its lease is held.
    async fn still_active(&self, id: &BlockId) -> bool {
        self.ledger
            .registry()
            .get(id)
            .await
            .is_some_and(|block| block.active)
    }

    async fn compose_and_sign(
        &self,
        block: &Block,
        index: u32,
        credential: &Credential,
        fields: &FormFields,
    ) -> Result<DocumentRef, IssuanceError> {
        let composed = self
            .bounded(
                "compose",
                self.composer
                    .compose_and_fill(&block.source_ref, index, credential, fields),
            )
            .await
            .map_err(|source| IssuanceError::CompositionFailure {
                block_id: block.id.clone(),
                index,
                source,
            })?;

        self.bounded("sign", self.composer.sign(&composed))
            .await
            .map_err(|source| IssuanceError::SigningFailure {
                block_id: block.id.clone(),
                index,
                source,
            })
    }

    async fn resolve_capacity(
        &self,
        request: &ImportRequest,
    ) -> Result<u32, IssuanceError> {
        let capacity = match request.capacity {
            Some(capacity) => capacity,
            None => {
                let pages = self
                    .bounded(
                        "pageCount",
                        self.composer
                            .page_count(&request.source_ref, &request.password),
                    )
                    .await
                    .map_err(IssuanceError::Composer)?;
                tracing::debug!(pages, "[rx-03] Capacity detected from page count");
                pages
            }
        };

        if capacity <= 0 {
            return Err(IssuanceError::Validation(format!(
                "capacity must be positive, got {}",
                capacity
            )));
        }
        u32::try_from(capacity).map_err(|_| {
            IssuanceError::Validation(format!("capacity {} is too large", capacity))
        })
    }
}

#[async_trait]
impl<KV: KeyValueStore, C: DocumentComposer> IssuanceApi for IssuanceWorkflow<KV, C> {
    async fn issue(&self, patient: PatientData) -> Result<Prescription, IssuanceError> {
        let patient = patient.trimmed();
        let missing = patient.missing_fields();
        if !missing.is_empty() {
            return Err(IssuanceError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let block = self.eligible_block().await?;
        let allocator = self.ledger.allocator();
        let reservation = allocator.reserve(&block.id).await?;
        if !self.still_active(&block.id).await {
            allocator.rollback(reservation);
            return Err(IssuanceError::NoEligibleBlock {
                reason: format!("block {} was deactivated while waiting", block.id),
            });
        }
        let index = reservation.index();
        let serial = reservation.serial().to_string();

        let credential = match self.credential_for(&block) {
            Ok(credential) => credential,
            Err(e) => {
                allocator.rollback(reservation);
                return Err(e);
            }
        };

        let fields = FormFields {
            serial: serial.clone(),
            patient: patient.clone(),
        };
        let signed = match self.compose_and_sign(&block, index, &credential, &fields).await {
            Ok(signed) => signed,
            Err(e) => {
                tracing::warn!(
                    block_id = %block.id,
                    index,
                    "[rx-03] Issuance failed, slot released: {}",
                    e
                );
                allocator.rollback(reservation);
                return Err(e);
            }
        };
        drop(credential);

        let entry = allocator.commit(reservation).await.map_err(|source| {
            tracing::error!(
                block_id = %block.id,
                serial = %serial,
                "[rx-03] Signed document orphaned, commit failed: {}",
                source
            );
            IssuanceError::CommitFailed {
                serial: serial.clone(),
                signed_document: signed.clone(),
                source,
            }
        })?;
        self.relay.publish(LedgerEvent::SerialIssued {
            block_id: block.id.clone(),
            serial: entry.serial.clone(),
        });

        let prescription = Prescription {
            id: PrescriptionId::generate(),
            block_id: block.id.clone(),
            index: entry.index,
            serial: entry.serial,
            patient,
            issued_at: entry.issued_at,
            signed_document: signed,
        };

        if let Err(source) = self
            .ledger
            .prescriptions()
            .record(prescription.clone())
            .await
        {
            tracing::error!(
                serial = %prescription.serial,
                "[rx-03] Prescription record not stored: {}",
                source
            );
            return Err(IssuanceError::Unrecorded {
                prescription: Box::new(prescription),
                source,
            });
        }

        self.relay.publish(LedgerEvent::SerialSigned {
            serial: prescription.serial.clone(),
            prescription_id: prescription.id.clone(),
        });
        tracing::info!(
            block_id = %prescription.block_id,
            serial = %prescription.serial,
            prescription_id = %prescription.id,
            "[rx-03] Prescription issued"
        );
        Ok(prescription)
    }

    async fn import_block(&self, request: ImportRequest) -> Result<Block, IssuanceError> {
        if request.source_ref.is_blank() {
            return Err(IssuanceError::Validation(
                "missing source document reference".to_string(),
            ));
        }
        let capacity = self.resolve_capacity(&request).await?;
        let encrypted_credential = self.vault.encrypt(request.password.expose())?;

        let registry = self.ledger.registry();
        let mut block = registry
            .import(NewBlock {
                label: request.label.clone(),
                source_ref: request.source_ref.clone(),
                serial_prefix: request.serial_prefix.clone(),
                serial_scheme: request.serial_scheme,
                capacity,
                encrypted_credential,
            })
            .await?;

        if request.activate {
            block = registry.activate(&block.id).await?;
        }

        self.relay.publish(LedgerEvent::BlockImported {
            prefix: block.serial_prefix.clone(),
            capacity: block.capacity,
        });
        tracing::info!(
            block_id = %block.id,
            prefix = %block.serial_prefix,
            capacity = block.capacity,
            protected = block.is_protected(),
            "[rx-03] Block imported"
        );
        Ok(block)
    }

    async fn inspect_fields(&self, block_id: &BlockId) -> Result<Vec<String>, IssuanceError> {
        let block = self.ledger.registry().get(block_id).await.ok_or_else(|| {
            IssuanceError::Ledger(LedgerError::BlockNotFound {
                block_id: block_id.clone(),
            })
        })?;
        let credential = self.credential_for(&block)?;
        self.bounded(
            "listFields",
            self.composer.list_fields(&block.source_ref, &credential),
        )
        .await
        .map_err(IssuanceError::Composer)
    }

    async fn share_prescription(&self, id: &PrescriptionId) -> Result<(), IssuanceError> {
        let prescription = self.ledger.prescriptions().get(id).await?;
        self.composer
            .share(&prescription.signed_document)
            .await
            .map_err(IssuanceError::Composer)
    }

    async fn open_prescription(&self, id: &PrescriptionId) -> Result<(), IssuanceError> {
        let prescription = self.ledger.prescriptions().get(id).await?;
        self.composer
            .open(&prescription.signed_document)
            .await
            .map_err(IssuanceError::Composer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockDocumentComposer, RecordingSyncRelay};
    use rx_01_credential_vault::SecretKey;
    use rx_02_block_ledger::test_utils::FixedTimeSource;
    use rx_02_block_ledger::{InMemoryKVStore, LedgerConfig, SourceRef};
    use std::time::Duration;

    struct Harness {
        workflow: IssuanceWorkflow<InMemoryKVStore, MockDocumentComposer>,
        composer: Arc<MockDocumentComposer>,
        relay: Arc<RecordingSyncRelay>,
        kv: InMemoryKVStore,
    }

    async fn harness(config: IssuanceConfig) -> Harness {
        harness_with(LedgerConfig::for_testing(), config).await
    }

    async fn harness_with(ledger_config: LedgerConfig, config: IssuanceConfig) -> Harness {
        let kv = InMemoryKVStore::new();
        let ledger = Arc::new(
            LedgerService::open(
                kv.clone(),
                ledger_config,
                Arc::new(FixedTimeSource::default()),
            )
            .await
            .unwrap(),
        );
        let composer = Arc::new(MockDocumentComposer::new());
        let relay = Arc::new(RecordingSyncRelay::new());
        let workflow = IssuanceWorkflow::new(
            ledger,
            CredentialVault::new(SecretKey::from_bytes([7u8; 32])),
            composer.clone(),
            relay.clone(),
            config,
        );
        Harness {
            workflow,
            composer,
            relay,
            kv,
        }
    }

    fn patient(name: &str) -> PatientData {
        PatientData {
            patient_name: name.to_string(),
            patient_document: "DNI 30111222".to_string(),
            medication: "Amoxicilina 500mg".to_string(),
            dosage: "1 cada 8h por 7 días".to_string(),
            ..Default::default()
        }
    }

    fn request(capacity: i64) -> ImportRequest {
        ImportRequest::new(SourceRef::new("file:///recetario.pdf"), "B2024-001")
            .label("recetario.pdf")
            .capacity(capacity)
            .activate(true)
    }

    #[tokio::test]
    async fn test_three_issues_then_exhausted() {
        let h = harness(IssuanceConfig::default()).await;
        h.workflow.import_block(request(3)).await.unwrap();

        let mut serials = Vec::new();
        for name in ["Ana", "Luis", "Marta"] {
            serials.push(h.workflow.issue(patient(name)).await.unwrap().serial);
        }
        assert_eq!(serials, vec!["B2024-001-001", "B2024-001-002", "B2024-001-003"]);

        assert!(matches!(
            h.workflow.issue(patient("Pedro")).await,
            Err(IssuanceError::CapacityExhausted { capacity: 3, .. })
        ));
        assert_eq!(h.workflow.ledger().prescriptions().list().await.len(), 3);
    }

    #[tokio::test]
    async fn test_composition_failure_rolls_back() {
        let h = harness(IssuanceConfig::default()).await;
        let block = h.workflow.import_block(request(3)).await.unwrap();
        let before = rx_02_block_ledger::KeyValueStore::get(&h.kv, "rx_blocks_v1")
            .await
            .unwrap();

        h.composer
            .fail_next_compose(ComposerError::Failed("page extraction".to_string()));
        let err = h.workflow.issue(patient("Ana")).await.unwrap_err();
        assert!(matches!(err, IssuanceError::CompositionFailure { index: 0, .. }));
        assert!(err.slot_released());

        let after = rx_02_block_ledger::KeyValueStore::get(&h.kv, "rx_blocks_v1")
            .await
            .unwrap();
        assert_eq!(before, after);

        let issued = h.workflow.issue(patient("Ana")).await.unwrap();
        assert_eq!(issued.index, 0);
        assert_eq!(issued.serial, "B2024-001-001");
        assert_eq!(issued.block_id, block.id);
    }

    #[tokio::test]
    async fn test_signing_failure_rolls_back() {
        let h = harness(IssuanceConfig::default()).await;
        h.workflow.import_block(request(3)).await.unwrap();

        h.composer.fail_next_sign(ComposerError::Cancelled);
        assert!(matches!(
            h.workflow.issue(patient("Ana")).await,
            Err(IssuanceError::SigningFailure { index: 0, .. })
        ));
        assert_eq!(
            h.workflow.issue(patient("Ana")).await.unwrap().serial,
            "B2024-001-001"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_composition_timeout_rolls_back() {
        let h = harness(
            IssuanceConfig::default().with_composition_timeout(Duration::from_secs(5)),
        )
        .await;
        h.workflow.import_block(request(3)).await.unwrap();

        h.composer.set_compose_delay(Duration::from_secs(30));
        let err = h.workflow.issue(patient("Ana")).await.unwrap_err();
        assert!(matches!(
            err,
            IssuanceError::CompositionFailure {
                source: ComposerError::Timeout { .. },
                ..
            }
        ));

        h.composer.set_compose_delay(Duration::ZERO);
        assert_eq!(h.workflow.issue(patient("Ana")).await.unwrap().index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_submit_queues_under_default_configs() {
        let h = harness_with(LedgerConfig::default(), IssuanceConfig::default()).await;
        h.workflow.import_block(request(3)).await.unwrap();
        h.composer.set_compose_delay(Duration::from_secs(90));

        let workflow = Arc::new(h.workflow);
        let first = {
            let workflow = workflow.clone();
            tokio::spawn(async move { workflow.issue(patient("Ana")).await })
        };
        let second = {
            let workflow = workflow.clone();
            tokio::spawn(async move { workflow.issue(patient("Luis")).await })
        };

        let mut serials = vec![
            first.await.unwrap().unwrap().serial,
            second.await.unwrap().unwrap().serial,
        ];
        serials.sort();
        assert_eq!(serials, vec!["B2024-001-001", "B2024-001-002"]);
    }

    #[tokio::test]
    async fn test_deactivated_while_queued_releases_slot() {
        let h = harness(IssuanceConfig::default()).await;
        let first = h.workflow.import_block(request(3)).await.unwrap();
        let second = h
            .workflow
            .import_block(request(3).activate(false))
            .await
            .unwrap();
        let ledger = h.workflow.ledger().clone();
        let held = ledger.allocator().reserve(&first.id).await.unwrap();

        let workflow = Arc::new(h.workflow);
        let queued = {
            let workflow = workflow.clone();
            tokio::spawn(async move { workflow.issue(patient("Ana")).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        ledger.registry().activate(&second.id).await.unwrap();
        ledger.allocator().rollback(held);

        assert!(matches!(
            queued.await.unwrap(),
            Err(IssuanceError::NoEligibleBlock { .. })
        ));
        assert!(h.composer.calls().is_empty());
        assert_eq!(ledger.registry().get(&first.id).await.unwrap().cursor, 0);

        let issued = workflow.issue(patient("Ana")).await.unwrap();
        assert_eq!(issued.block_id, second.id);
    }

    #[tokio::test]
    async fn test_required_fields() {
        let h = harness(IssuanceConfig::default()).await;
        h.workflow.import_block(request(3)).await.unwrap();

        let mut incomplete = patient("Ana");
        incomplete.dosage = "   ".to_string();
        let err = h.workflow.issue(incomplete).await.unwrap_err();
        assert!(matches!(err, IssuanceError::Validation(ref m) if m.contains("dosage")));
        assert!(h.composer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_active_block() {
        let h = harness(IssuanceConfig::default()).await;
        h.workflow
            .import_block(request(3).activate(false))
            .await
            .unwrap();
        assert!(matches!(
            h.workflow.issue(patient("Ana")).await,
            Err(IssuanceError::NoEligibleBlock { .. })
        ));
    }

    #[tokio::test]
    async fn test_protected_block_passes_password() {
        let h = harness(IssuanceConfig::default()).await;
        h.composer.require_credential("s3cret");
        let block = h
            .workflow
            .import_block(request(3).password("s3cret"))
            .await
            .unwrap();
        assert!(block.is_protected());
        assert!(!block.encrypted_credential.contains("s3cret"));

        h.workflow.issue(patient("Ana")).await.unwrap();
    }

    #[tokio::test]
    async fn test_undecryptable_credential_blocks_composition() {
        let h = harness(IssuanceConfig::default()).await;
        let block = h
            .workflow
            .import_block(request(3).password("s3cret"))
            .await
            .unwrap();

        let other_key = IssuanceWorkflow::new(
            h.workflow.ledger().clone(),
            CredentialVault::new(SecretKey::from_bytes([9u8; 32])),
            h.composer.clone(),
            h.relay.clone(),
            IssuanceConfig::default(),
        );
        assert!(matches!(
            other_key.issue(patient("Ana")).await,
            Err(IssuanceError::CredentialDecryptionFailure { .. })
        ));
        assert!(h.composer.calls().is_empty());

        let stored = h.workflow.ledger().registry().get(&block.id).await.unwrap();
        assert_eq!(stored.cursor, 0);
    }

    #[tokio::test]
    async fn test_capacity_auto_detected() {
        let h = harness(IssuanceConfig::default()).await;
        h.composer.set_page_count(25);
        let mut req = request(1);
        req.capacity = None;
        let block = h.workflow.import_block(req).await.unwrap();
        assert_eq!(block.capacity, 25);
    }

    #[tokio::test]
    async fn test_non_positive_capacity_rejected() {
        let h = harness(IssuanceConfig::default()).await;
        assert!(matches!(
            h.workflow.import_block(request(0)).await,
            Err(IssuanceError::Validation(_))
        ));

        h.composer.set_page_count(0);
        let mut req = request(1);
        req.capacity = None;
        assert!(matches!(
            h.workflow.import_block(req).await,
            Err(IssuanceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_events_relayed() {
        let h = harness(IssuanceConfig::default()).await;
        h.workflow.import_block(request(3)).await.unwrap();
        h.workflow.issue(patient("Ana")).await.unwrap();

        assert_eq!(
            h.relay.names(),
            vec!["BlockImported", "SerialIssued", "SerialSigned"]
        );
    }

    #[tokio::test]
    async fn test_share_and_open() {
        let h = harness(IssuanceConfig::default()).await;
        h.workflow.import_block(request(3)).await.unwrap();
        let issued = h.workflow.issue(patient("Ana")).await.unwrap();

        h.workflow.share_prescription(&issued.id).await.unwrap();
        h.workflow.open_prescription(&issued.id).await.unwrap();
        assert!(matches!(
            h.workflow
                .share_prescription(&PrescriptionId::new("rx_missing"))
                .await,
            Err(IssuanceError::Ledger(LedgerError::PrescriptionNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_inspect_fields() {
        let h = harness(IssuanceConfig::default()).await;
        let block = h.workflow.import_block(request(3)).await.unwrap();
        let fields = h.workflow.inspect_fields(&block.id).await.unwrap();
        assert!(fields.contains(&"medication".to_string()));
    }
}
