//! Block Registry: the persisted block collection and its per-block leases.
//!
//! Every write clones the current set, applies the change, persists the full
//! replacement value and only then swaps the clone in. A failed write leaves
//! the in-memory view identical to what is on disk.
//!
//! Lock order is per-block lease first, then the state lock.

use super::block_set::BlockSet;
use super::persistence;
use crate::domain::entities::{Block, BlockId, NewBlock};
use crate::domain::errors::LedgerError;
use crate::domain::invariants::{check_block, invariant_single_active};
use crate::domain::journal::Journal;
use crate::domain::value_objects::{LedgerConfig, QuarantinedBlock};
use crate::ports::inbound::BlockRegistryApi;
use crate::ports::outbound::{KeyValueStore, TimeSource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as LeaseMutex, OwnedMutexGuard, RwLock};

/// Persisted block collection.
pub struct BlockRegistry<KV: KeyValueStore> {
    kv: Arc<KV>,
    time: Arc<dyn TimeSource>,
    config: LedgerConfig,
    state: RwLock<BlockSet>,
    leases: parking_lot::Mutex<HashMap<BlockId, Arc<LeaseMutex<()>>>>,
}

impl<KV: KeyValueStore> BlockRegistry<KV> {
    /// Load the registry from storage.
    ///
    /// ## Errors
    ///
    /// - `LedgerCorruption`: the stored value is not a JSON array
    /// - `StorageUnavailable`: the read kept failing
    pub async fn open(
        kv: Arc<KV>,
        time: Arc<dyn TimeSource>,
        config: LedgerConfig,
    ) -> Result<Self, LedgerError> {
        let bytes = persistence::load(kv.as_ref(), &config.blocks_key, &config).await?;
        let set = BlockSet::decode(bytes.as_deref(), &config.blocks_key)?;

        tracing::info!(
            blocks = set.len(),
            quarantined = set.quarantined().len(),
            unreadable = set.unreadable_count(),
            "[rx-02] Block registry loaded from {}",
            config.blocks_key
        );
        if let Err(e) = invariant_single_active(set.iter()) {
            tracing::warn!("[rx-02] {}; issuance blocked until a block is activated", e);
        }

        Ok(Self {
            kv,
            time,
            config,
            state: RwLock::new(set),
            leases: parking_lot::Mutex::new(HashMap::new()),
        })
    }

    /// Ledger configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> crate::domain::entities::Timestamp {
        self.time.now()
    }

    fn lease(&self, id: &BlockId) -> Arc<LeaseMutex<()>> {
        self.leases
            .lock()
            .entry(id.clone())
            .or_insert_with(|| Arc::new(LeaseMutex::new(())))
            .clone()
    }

    /// Take the block's lease, waiting at most `config.reserve_wait`.
    pub(crate) async fn acquire_lease(
        &self,
        id: &BlockId,
    ) -> Result<OwnedMutexGuard<()>, LedgerError> {
        let wait = self.config.reserve_wait;
        tokio::time::timeout(wait, self.lease(id).lock_owned())
            .await
            .map_err(|_| {
                tracing::warn!(block_id = %id, "[rx-02] Lease wait timed out");
                LedgerError::BlockBusy {
                    block_id: id.clone(),
                    waited_ms: u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                }
            })
    }

    /// Block plus its quarantine reason, if any.
    pub(crate) async fn snapshot(&self, id: &BlockId) -> Option<(Block, Option<String>)> {
        let state = self.state.read().await;
        let block = state.get(id)?.clone();
        let reason = state.quarantine_reason(id).map(str::to_string);
        Some((block, reason))
    }

    /// Apply `change` to a copy of the set, persist it, then publish it.
    pub(crate) async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut BlockSet) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let out = change(&mut next)?;

        let bytes = next.encode()?;
        persistence::store(self.kv.as_ref(), &self.config.blocks_key, &bytes, &self.config)
            .await?;

        *state = next;
        Ok(out)
    }

    /// Read-only access to the current set.
    pub(crate) async fn read<T>(&self, f: impl FnOnce(&BlockSet) -> T) -> T {
        let state = self.state.read().await;
        f(&state)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    prefix.trim().to_uppercase()
}

fn immutable_field(stored: &Block, incoming: &Block) -> Option<&'static str> {
    if stored.source_ref != incoming.source_ref {
        Some("sourceRef")
    } else if stored.imported_at != incoming.imported_at {
        Some("importedAt")
    } else if stored.serial_prefix != incoming.serial_prefix {
        Some("serialPrefix")
    } else if stored.serial_scheme != incoming.serial_scheme {
        Some("serialScheme")
    } else if stored.capacity != incoming.capacity {
        Some("capacity")
    } else if stored.encrypted_credential != incoming.encrypted_credential {
        Some("encryptedCredential")
    } else {
        None
    }
}

#[async_trait]
impl<KV: KeyValueStore> BlockRegistryApi for BlockRegistry<KV> {
    async fn get_all(&self) -> Vec<Block> {
        self.read(|set| set.iter().cloned().collect()).await
    }

    async fn get(&self, id: &BlockId) -> Option<Block> {
        self.read(|set| set.get(id).cloned()).await
    }

    async fn import(&self, new_block: NewBlock) -> Result<Block, LedgerError> {
        if new_block.source_ref.is_blank() {
            return Err(LedgerError::Validation(
                "missing source document reference".to_string(),
            ));
        }
        if new_block.capacity == 0 {
            return Err(LedgerError::Validation(
                "capacity must be a positive number of forms".to_string(),
            ));
        }

        let prefix = normalize_prefix(&new_block.serial_prefix);
        new_block
            .serial_scheme
            .validate_prefix(&prefix, new_block.capacity)
            .map_err(LedgerError::Validation)?;

        let block = Block {
            id: BlockId::generate(),
            label: new_block.label.trim().to_string(),
            source_ref: new_block.source_ref,
            imported_at: self.time.now(),
            serial_prefix: prefix,
            serial_scheme: new_block.serial_scheme,
            capacity: new_block.capacity,
            cursor: 0,
            encrypted_credential: new_block.encrypted_credential,
            journal: Journal::new(),
            active: false,
        };

        self.add(block).await
    }

    async fn add(&self, block: Block) -> Result<Block, LedgerError> {
        if block.serial_prefix.trim().is_empty() {
            return Err(LedgerError::Validation("serial prefix is empty".to_string()));
        }
        check_block(&block).map_err(|e| LedgerError::Validation(e.to_string()))?;

        let added = self
            .mutate(|set| {
                if set.contains(&block.id) {
                    return Err(LedgerError::BlockExists {
                        block_id: block.id.clone(),
                    });
                }
                if block.active {
                    for other in set.iter_mut() {
                        other.active = false;
                    }
                }
                set.insert_front(block.clone());
                Ok(block)
            })
            .await?;

        tracing::info!(
            block_id = %added.id,
            prefix = %added.serial_prefix,
            capacity = added.capacity,
            "[rx-02] Block registered"
        );
        Ok(added)
    }

    async fn update(&self, block: Block) -> Result<Block, LedgerError> {
        self.mutate(|set| {
            let stored = set.get_mut(&block.id).ok_or_else(|| LedgerError::BlockNotFound {
                block_id: block.id.clone(),
            })?;
            if let Some(field) = immutable_field(stored, &block) {
                return Err(LedgerError::ImmutableField {
                    block_id: block.id.clone(),
                    field,
                });
            }
            stored.label = block.label.trim().to_string();
            Ok(stored.clone())
        })
        .await
    }

    async fn remove(&self, id: &BlockId) -> Result<Block, LedgerError> {
        let _lease = self.acquire_lease(id).await?;

        let removed = self
            .mutate(|set| {
                set.remove(id).ok_or_else(|| LedgerError::BlockNotFound {
                    block_id: id.clone(),
                })
            })
            .await?;

        self.leases.lock().remove(id);
        tracing::info!(
            block_id = %id,
            issued = removed.journal.len(),
            "[rx-02] Block removed"
        );
        Ok(removed)
    }

    async fn activate(&self, id: &BlockId) -> Result<Block, LedgerError> {
        let activated = self
            .mutate(|set| {
                let target = set.get(id).ok_or_else(|| LedgerError::BlockNotFound {
                    block_id: id.clone(),
                })?;
                if let Some(reason) = set.quarantine_reason(id) {
                    return Err(LedgerError::corruption(id, reason));
                }
                if target.is_exhausted() {
                    return Err(LedgerError::CapacityExhausted {
                        block_id: id.clone(),
                        capacity: target.capacity,
                    });
                }

                for block in set.iter_mut() {
                    block.active = &block.id == id;
                }
                invariant_single_active(set.iter())?;

                set.get(id).cloned().ok_or_else(|| LedgerError::BlockNotFound {
                    block_id: id.clone(),
                })
            })
            .await?;

        tracing::info!(block_id = %id, "[rx-02] Block activated");
        Ok(activated)
    }

    async fn active(&self) -> Result<Option<Block>, LedgerError> {
        self.read(|set| -> Result<Option<Block>, LedgerError> {
            invariant_single_active(set.iter())?;
            Ok(set.iter().find(|b| b.active).cloned())
        })
        .await
    }

    async fn quarantined(&self) -> Vec<QuarantinedBlock> {
        self.read(BlockSet::quarantined).await
    }
}
