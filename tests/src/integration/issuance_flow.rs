//! # Issuance Flow
//!
//! Vault, ledger and workflow wired together over an in-memory store:
//! import, activate, issue until exhausted, rollback reuse and the
//! prescription log that results.

#[cfg(test)]
mod tests {
    use crate::fixtures::{import_request, patient, Harness};
    use rx_02_block_ledger::test_utils::FixedTimeSource;
    use rx_02_block_ledger::{
        BlockRegistryApi, InMemoryKVStore, KeyValueStore, PrescriptionLogApi, StorageKeys,
    };
    use rx_03_issuance::{ComposerError, IssuanceApi, IssuanceError, LedgerEvent};
    use std::sync::Arc;

    async fn harness() -> (Harness<InMemoryKVStore>, InMemoryKVStore) {
        let kv = InMemoryKVStore::new();
        let h = Harness::open(kv.clone(), Arc::new(FixedTimeSource::default())).await;
        (h, kv)
    }

    // =========================================================================
    // HAPPY PATH
    // =========================================================================

    #[tokio::test]
    async fn test_block_issues_every_serial_once() {
        let (h, _) = harness().await;
        h.composer.require_credential("s3cret");
        let block = h
            .workflow
            .import_block(import_request("B2024-001", 3))
            .await
            .unwrap();

        let mut issued = Vec::new();
        for name in ["Ana Souza", "Luis Pardo", "Marta Gil"] {
            issued.push(h.workflow.issue(patient(name)).await.unwrap());
        }
        let serials: Vec<_> = issued.iter().map(|p| p.serial.as_str()).collect();
        assert_eq!(serials, ["B2024-001-001", "B2024-001-002", "B2024-001-003"]);
        assert!(issued.iter().all(|p| p.block_id == block.id));

        assert!(matches!(
            h.workflow.issue(patient("Pedro Ruiz")).await,
            Err(IssuanceError::CapacityExhausted { ref block_id, capacity: 3 }) if *block_id == block.id
        ));

        let stored = h.workflow.ledger().registry().get(&block.id).await.unwrap();
        assert_eq!(stored.cursor, 3);
        assert_eq!(stored.journal.len(), 3);
        assert_eq!(h.composer.signed_count(), 3);

        let log = h.workflow.ledger().prescriptions();
        assert_eq!(log.list().await.len(), 3);
        assert_eq!(log.search("marta").await[0].serial, "B2024-001-003");
    }

    #[tokio::test]
    async fn test_events_follow_issuance() {
        let (h, _) = harness().await;
        h.workflow
            .import_block(import_request("B2024-001", 3))
            .await
            .unwrap();
        let issued = h.workflow.issue(patient("Ana Souza")).await.unwrap();

        let events = h.relay.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[2],
            LedgerEvent::SerialSigned { serial, prescription_id }
                if serial == "B2024-001-001" && *prescription_id == issued.id
        ));
    }

    // =========================================================================
    // ROLLBACK
    // =========================================================================

    #[tokio::test]
    async fn test_failed_issue_leaves_storage_untouched_and_slot_reusable() {
        let (h, kv) = harness().await;
        h.workflow
            .import_block(import_request("B2024-001", 3))
            .await
            .unwrap();
        let before = kv.get(StorageKeys::BLOCKS).await.unwrap();

        h.composer
            .fail_next_compose(ComposerError::Failed("page 0 unreadable".to_string()));
        let err = h.workflow.issue(patient("Ana Souza")).await.unwrap_err();
        assert!(err.slot_released());
        assert_eq!(kv.get(StorageKeys::BLOCKS).await.unwrap(), before);

        let retry = h.workflow.issue(patient("Ana Souza")).await.unwrap();
        assert_eq!(retry.index, 0);
        assert_eq!(retry.serial, "B2024-001-001");
    }

    // =========================================================================
    // ACTIVE BLOCK
    // =========================================================================

    #[tokio::test]
    async fn test_activation_switches_issuing_block() {
        let (h, _) = harness().await;
        let first = h
            .workflow
            .import_block(import_request("B2024-001", 3))
            .await
            .unwrap();
        let second = h
            .workflow
            .import_block(import_request("B2024-002", 3))
            .await
            .unwrap();

        let registry = h.workflow.ledger().registry();
        let active: Vec<_> = registry
            .get_all()
            .await
            .into_iter()
            .filter(|b| b.active)
            .map(|b| b.id)
            .collect();
        assert_eq!(active, vec![second.id.clone()]);
        assert_eq!(
            h.workflow.issue(patient("Ana Souza")).await.unwrap().serial,
            "B2024-002-001"
        );

        registry.activate(&first.id).await.unwrap();
        assert_eq!(
            h.workflow.issue(patient("Luis Pardo")).await.unwrap().serial,
            "B2024-001-001"
        );
        assert!(!registry.get(&second.id).await.unwrap().active);
    }
}
