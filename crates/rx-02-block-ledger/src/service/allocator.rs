//! Serial Allocator: reserve/commit/rollback over a block's cursor.
//!
//! `reserve` takes the block's lease and reads the cursor without writing
//! anything. The lease travels inside the `Reservation`, so every other
//! reserve or manual override on that block waits until it is settled.
//! `commit` is the only path that advances the cursor.

use super::registry::BlockRegistry;
use crate::domain::entities::{Block, BlockId, IssuedEntry};
use crate::domain::errors::LedgerError;
use crate::domain::invariants::check_block;
use crate::domain::reservation::Reservation;
use crate::ports::inbound::SerialAllocatorApi;
use crate::ports::outbound::KeyValueStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Allocator over the blocks of a registry.
pub struct SerialAllocator<KV: KeyValueStore> {
    registry: Arc<BlockRegistry<KV>>,
}

impl<KV: KeyValueStore> SerialAllocator<KV> {
    pub fn new(registry: Arc<BlockRegistry<KV>>) -> Self {
        Self { registry }
    }

    async fn load(&self, id: &BlockId) -> Result<Block, LedgerError> {
        let (block, quarantine) =
            self.registry
                .snapshot(id)
                .await
                .ok_or_else(|| LedgerError::BlockNotFound {
                    block_id: id.clone(),
                })?;
        if let Some(reason) = quarantine {
            return Err(LedgerError::corruption(id, reason));
        }
        Ok(block)
    }
}

#[async_trait]
impl<KV: KeyValueStore> SerialAllocatorApi for SerialAllocator<KV> {
    async fn reserve(&self, id: &BlockId) -> Result<Reservation, LedgerError> {
        let lease = self.registry.acquire_lease(id).await?;
        let block = self.load(id).await?;

        if block.is_exhausted() {
            return Err(LedgerError::CapacityExhausted {
                block_id: id.clone(),
                capacity: block.capacity,
            });
        }

        let index = block.cursor;
        let serial = block.serial_for(index);
        tracing::debug!(block_id = %id, index, serial = %serial, "[rx-02] Slot reserved");

        Ok(Reservation::new(
            id.clone(),
            index,
            serial,
            self.registry.now(),
            lease,
        ))
    }

    async fn commit(&self, mut reservation: Reservation) -> Result<IssuedEntry, LedgerError> {
        // Settled on every path: a failed commit is reported by the error, not the drop hook.
        reservation.settle();
        let block_id = reservation.block_id.clone();
        let index = reservation.index;

        let block = self.load(&block_id).await?;
        if let Some(existing) = block.journal.get(index) {
            tracing::debug!(block_id = %block_id, index, "[rx-02] Slot already committed");
            return Ok(existing.clone());
        }

        let issued_at = self.registry.now();
        let entry = self
            .registry
            .mutate(|set| {
                let block = set
                    .get_mut(&block_id)
                    .ok_or_else(|| LedgerError::BlockNotFound {
                        block_id: block_id.clone(),
                    })?;
                if block.cursor != index {
                    return Err(LedgerError::StaleReservation {
                        block_id: block_id.clone(),
                        index,
                        cursor: block.cursor,
                    });
                }

                let entry = IssuedEntry {
                    index,
                    serial: block.serial_for(index),
                    issued_at,
                };
                block.cursor = index + 1;
                block.journal.append(entry.clone());
                check_block(block)?;
                Ok(entry)
            })
            .await
            .inspect_err(|e| {
                tracing::error!(block_id = %block_id, index, "[rx-02] Commit failed: {}", e);
            })?;

        tracing::info!(
            block_id = %block_id,
            index,
            serial = %entry.serial,
            "[rx-02] Serial committed"
        );
        Ok(entry)
    }

    fn rollback(&self, mut reservation: Reservation) {
        reservation.settle();
        tracing::debug!(
            block_id = %reservation.block_id,
            index = reservation.index,
            "[rx-02] Reservation rolled back"
        );
    }

    async fn set_cursor(&self, id: &BlockId, new_index: i64) -> Result<Block, LedgerError> {
        let _lease = self.registry.acquire_lease(id).await?;
        self.load(id).await?;

        let (previous, updated) = self
            .registry
            .mutate(|set| {
                let block = set.get_mut(id).ok_or_else(|| LedgerError::BlockNotFound {
                    block_id: id.clone(),
                })?;
                let clamped = new_index.clamp(0, i64::from(block.capacity));
                let requested = u32::try_from(clamped).unwrap_or(block.capacity);
                let floor = block.journal.cursor_floor();
                if requested < floor {
                    return Err(LedgerError::CursorBelowJournal {
                        block_id: id.clone(),
                        requested,
                        floor,
                    });
                }

                let previous = block.cursor;
                block.cursor = requested;
                check_block(block)?;
                Ok((previous, block.clone()))
            })
            .await?;

        tracing::info!(
            block_id = %id,
            from = previous,
            to = updated.cursor,
            "[rx-02] Cursor overridden"
        );
        Ok(updated)
    }

    async fn preview_serial(&self, id: &BlockId, index: u32) -> Result<String, LedgerError> {
        let (block, _) =
            self.registry
                .snapshot(id)
                .await
                .ok_or_else(|| LedgerError::BlockNotFound {
                    block_id: id.clone(),
                })?;
        if index >= block.capacity {
            return Err(LedgerError::Validation(format!(
                "index {} outside block of {} forms",
                index, block.capacity
            )));
        }
        Ok(block.serial_for(index))
    }
}
