//! # Concurrent Issuance
//!
//! Parallel `issue` calls against one block on a multi-threaded runtime
//! must hand out distinct serials and stop cleanly at capacity.

#[cfg(test)]
mod tests {
    use crate::fixtures::{import_request, patient, Harness};
    use rx_02_block_ledger::{
        BlockId, BlockRegistryApi, InMemoryKVStore, SerialAllocatorApi, SystemTimeSource,
    };
    use rx_03_issuance::{IssuanceApi, IssuanceError};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_issues_get_distinct_serials() {
        const CAPACITY: usize = 20;
        const CALLERS: usize = 24;

        let h = Harness::open(InMemoryKVStore::new(), Arc::new(SystemTimeSource)).await;
        h.composer.set_compose_delay(Duration::from_millis(2));
        let block = h
            .workflow
            .import_block(import_request("B2024-007", CAPACITY as i64))
            .await
            .unwrap();

        let workflow = Arc::new(h.workflow);
        let handles: Vec<_> = (0..CALLERS)
            .map(|i| {
                let workflow = workflow.clone();
                tokio::spawn(async move { workflow.issue(patient(&format!("Patient {}", i))).await })
            })
            .collect();

        let mut serials = HashSet::new();
        let mut refused = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(prescription) => assert!(serials.insert(prescription.serial)),
                Err(IssuanceError::CapacityExhausted { capacity, .. }) => {
                    assert_eq!(capacity as usize, CAPACITY);
                    refused += 1;
                }
                Err(other) => panic!("unexpected failure: {:?}", other),
            }
        }

        assert_eq!(serials.len(), CAPACITY);
        assert_eq!(refused, CALLERS - CAPACITY);

        let stored = workflow.ledger().registry().get(&block.id).await.unwrap();
        assert_eq!(stored.cursor as usize, CAPACITY);
        assert_eq!(stored.journal.len(), CAPACITY);
        assert_eq!(stored.journal.first_duplicate(), None);
        assert_eq!(workflow.ledger().prescriptions().len().await, CAPACITY);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reservations_queue_on_one_block() {
        let h = Harness::open(InMemoryKVStore::new(), Arc::new(SystemTimeSource)).await;
        let block = h
            .workflow
            .import_block(import_request("B2024-008", 5))
            .await
            .unwrap();
        let ledger = h.workflow.ledger().clone();

        let first = ledger.allocator().reserve(&block.id).await.unwrap();
        assert_eq!(first.index(), 0);

        let waiter = {
            let ledger = ledger.clone();
            let id: BlockId = block.id.clone();
            tokio::spawn(async move { ledger.allocator().reserve(&id).await.map(|r| r.index()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        ledger.allocator().commit(first).await.unwrap();
        assert_eq!(waiter.await.unwrap().unwrap(), 1);
    }
}
