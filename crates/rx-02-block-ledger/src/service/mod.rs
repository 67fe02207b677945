//! # Block Ledger Service
//!
//! Wires the registry, the allocator and the prescription log over one
//! key-value store and one clock.
//!
//! ## Architecture
//!
//! - `BlockRegistry` implements `BlockRegistryApi` and owns the block set
//! - `SerialAllocator` implements `SerialAllocatorApi` on top of the registry
//! - `PrescriptionLog` implements `PrescriptionLogApi`

mod allocator;
mod block_set;
mod persistence;
mod prescriptions;
mod registry;

pub use allocator::SerialAllocator;
pub use prescriptions::PrescriptionLog;
pub use registry::BlockRegistry;

use crate::domain::errors::LedgerError;
use crate::domain::value_objects::{LedgerConfig, LedgerStats};
use crate::ports::outbound::{KeyValueStore, TimeSource};
use std::sync::Arc;

/// The Block Ledger.
pub struct LedgerService<KV: KeyValueStore> {
    registry: Arc<BlockRegistry<KV>>,
    allocator: SerialAllocator<KV>,
    prescriptions: PrescriptionLog<KV>,
    time: Arc<dyn TimeSource>,
}

impl<KV: KeyValueStore> LedgerService<KV> {
    /// Open the ledger over `kv`, loading both collections.
    pub async fn open(
        kv: KV,
        config: LedgerConfig,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, LedgerError> {
        let kv = Arc::new(kv);
        let registry =
            Arc::new(BlockRegistry::open(kv.clone(), time.clone(), config.clone()).await?);
        let prescriptions = PrescriptionLog::open(kv, config).await?;
        let allocator = SerialAllocator::new(registry.clone());

        Ok(Self {
            registry,
            allocator,
            prescriptions,
            time,
        })
    }

    /// Block registry.
    pub fn registry(&self) -> &BlockRegistry<KV> {
        &self.registry
    }

    /// Serial allocator.
    pub fn allocator(&self) -> &SerialAllocator<KV> {
        &self.allocator
    }

    /// Prescription log.
    pub fn prescriptions(&self) -> &PrescriptionLog<KV> {
        &self.prescriptions
    }

    /// Clock shared by every component.
    pub fn time(&self) -> &Arc<dyn TimeSource> {
        &self.time
    }

    /// Aggregate counters.
    pub async fn stats(&self) -> LedgerStats {
        let mut stats = self
            .registry
            .read(|set| {
                let mut stats = LedgerStats {
                    total_blocks: set.len(),
                    quarantined_blocks: set.quarantined().len(),
                    ..LedgerStats::default()
                };
                for block in set.iter() {
                    if block.is_exhausted() {
                        stats.exhausted_blocks += 1;
                    }
                    stats.total_capacity += u64::from(block.capacity);
                    stats.total_consumed += u64::from(block.cursor);
                    stats.total_issued += block.journal.len() as u64;
                    if block.active && stats.active_remaining.is_none() {
                        stats.active_remaining = Some(block.remaining());
                    }
                }
                stats
            })
            .await;

        let today = self.time.now().date_naive();
        stats.prescriptions = self.prescriptions.len().await;
        stats.prescriptions_today = self.prescriptions.issued_on(today).await;
        stats
    }
}
