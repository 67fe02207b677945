//! # Persistence
//!
//! The ledger over `FileKVStore`: state survives a re-open, and damaged
//! data on disk is quarantined or carried through rather than lost.

#[cfg(test)]
mod tests {
    use crate::fixtures::{import_request, patient, Harness};
    use rx_02_block_ledger::test_utils::sample_block;
    use rx_02_block_ledger::{
        BlockRegistryApi, FileKVStore, KeyValueStore, LedgerConfig, LedgerError, LedgerService,
        PrescriptionLogApi, SerialAllocatorApi, StorageKeys, SystemTimeSource,
    };
    use rx_03_issuance::IssuanceApi;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_issued_state_survives_reopen() {
        let dir = tempdir().unwrap();

        let block_id = {
            let h = Harness::open(FileKVStore::new(dir.path()), Arc::new(SystemTimeSource)).await;
            let block = h
                .workflow
                .import_block(import_request("B2024-001", 5))
                .await
                .unwrap();
            h.workflow.issue(patient("Ana Souza")).await.unwrap();
            h.workflow.issue(patient("Luis Pardo")).await.unwrap();
            block.id
        };

        let h = Harness::open(FileKVStore::new(dir.path()), Arc::new(SystemTimeSource)).await;
        let registry = h.workflow.ledger().registry();
        let block = registry.active().await.unwrap().unwrap();
        assert_eq!(block.id, block_id);
        assert_eq!(block.cursor, 2);
        assert_eq!(block.journal.len(), 2);
        assert_eq!(h.workflow.ledger().prescriptions().list().await.len(), 2);

        let next = h.workflow.issue(patient("Marta Gil")).await.unwrap();
        assert_eq!(next.index, 2);
        assert_eq!(next.serial, "B2024-001-003");
    }

    #[tokio::test]
    async fn test_reservation_without_commit_is_not_persisted() {
        let dir = tempdir().unwrap();

        let block_id = {
            let h = Harness::open(FileKVStore::new(dir.path()), Arc::new(SystemTimeSource)).await;
            let block = h
                .workflow
                .import_block(import_request("B2024-001", 5))
                .await
                .unwrap();
            let reservation = h.workflow.ledger().allocator().reserve(&block.id).await;
            // Process "dies" holding the reservation.
            drop(reservation);
            block.id
        };

        let h = Harness::open(FileKVStore::new(dir.path()), Arc::new(SystemTimeSource)).await;
        let block = h.workflow.ledger().registry().get(&block_id).await.unwrap();
        assert_eq!(block.cursor, 0);
        assert_eq!(h.workflow.issue(patient("Ana Souza")).await.unwrap().index, 0);
    }

    #[tokio::test]
    async fn test_damaged_entries_quarantined_and_preserved() {
        let dir = tempdir().unwrap();
        let store = FileKVStore::new(dir.path());

        let mut broken = sample_block("B2023-099", 3);
        broken.cursor = 7;
        let mut healthy = sample_block("B2024-001", 3);
        healthy.active = true;
        let raw = serde_json::json!([
            serde_json::to_value(&healthy).unwrap(),
            serde_json::to_value(&broken).unwrap(),
            { "note": "written by an older build" },
        ]);
        store
            .put(StorageKeys::BLOCKS, raw.to_string().as_bytes())
            .await
            .unwrap();

        let h = Harness::open(store.clone(), Arc::new(SystemTimeSource)).await;
        let registry = h.workflow.ledger().registry();
        let quarantined = registry.quarantined().await;
        assert_eq!(quarantined.len(), 1);
        assert_eq!(quarantined[0].block_id, broken.id);
        assert!(matches!(
            registry.activate(&broken.id).await,
            Err(LedgerError::LedgerCorruption { .. })
        ));

        let issued = h.workflow.issue(patient("Ana Souza")).await.unwrap();
        assert_eq!(issued.block_id, healthy.id);

        let persisted: Vec<serde_json::Value> =
            serde_json::from_slice(&store.get(StorageKeys::BLOCKS).await.unwrap().unwrap())
                .unwrap();
        assert_eq!(persisted.len(), 3);
        assert!(persisted.iter().any(|v| v["id"] == broken.id.as_str()));
        assert!(persisted.iter().any(|v| v["note"] == "written by an older build"));
    }

    #[tokio::test]
    async fn test_unparseable_collection_refuses_to_open() {
        let dir = tempdir().unwrap();
        let store = FileKVStore::new(dir.path());
        store.put(StorageKeys::BLOCKS, b"{ not json").await.unwrap();

        let result =
            LedgerService::open(store, LedgerConfig::for_testing(), Arc::new(SystemTimeSource))
                .await;
        assert!(matches!(result, Err(LedgerError::LedgerCorruption { .. })));
    }
}
