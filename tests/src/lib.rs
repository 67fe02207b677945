//! # Rx-Ledger Test Suite
//!
//! Unified test crate for flows that cross subsystem boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── issuance_flow.rs   # vault + ledger + workflow, end to end
//!     ├── concurrency.rs     # parallel issuance on one block
//!     └── persistence.rs     # re-open from disk, corrupted data
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rx-tests
//! cargo test -p rx-tests integration::concurrency
//! ```

pub mod integration;

pub mod fixtures {
    //! Shared wiring for integration tests.

    use rx_01_credential_vault::{CredentialVault, SecretKey};
    use rx_02_block_ledger::{
        KeyValueStore, LedgerConfig, LedgerService, PatientData, SourceRef, TimeSource,
    };
    use rx_03_issuance::{
        ImportRequest, IssuanceConfig, IssuanceWorkflow, MockDocumentComposer, RecordingSyncRelay,
    };
    use std::sync::Arc;

    /// Key shared by every fixture vault so data written by one wiring
    /// decrypts under the next.
    pub fn test_key() -> SecretKey {
        SecretKey::from_bytes([0x42; 32])
    }

    /// Workflow plus handles to its doubles.
    pub struct Harness<KV: KeyValueStore> {
        pub workflow: IssuanceWorkflow<KV, MockDocumentComposer>,
        pub composer: Arc<MockDocumentComposer>,
        pub relay: Arc<RecordingSyncRelay>,
    }

    impl<KV: KeyValueStore> Harness<KV> {
        /// Open a ledger over `kv` and wire a workflow around it.
        pub async fn open(kv: KV, time: Arc<dyn TimeSource>) -> Self {
            let ledger = LedgerService::open(kv, LedgerConfig::for_testing(), time)
                .await
                .unwrap();
            let composer = Arc::new(MockDocumentComposer::new());
            let relay = Arc::new(RecordingSyncRelay::new());
            let workflow = IssuanceWorkflow::new(
                Arc::new(ledger),
                CredentialVault::new(test_key()),
                composer.clone(),
                relay.clone(),
                IssuanceConfig::default(),
            );
            Self {
                workflow,
                composer,
                relay,
            }
        }
    }

    /// Request for a protected block of `capacity` forms.
    pub fn import_request(prefix: &str, capacity: i64) -> ImportRequest {
        ImportRequest::new(SourceRef::new(format!("file:///{}.pdf", prefix)), prefix)
            .label(format!("{}.pdf", prefix))
            .capacity(capacity)
            .password("s3cret")
            .activate(true)
    }

    /// Patient with every required field set.
    pub fn patient(name: &str) -> PatientData {
        PatientData {
            patient_name: name.to_string(),
            patient_document: "DNI 30111222".to_string(),
            medication: "Amoxicillin 500mg".to_string(),
            dosage: "1 capsule every 8 hours for 7 days".to_string(),
            ..PatientData::default()
        }
    }
}
