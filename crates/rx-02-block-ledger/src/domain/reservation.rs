//! # Reservation
//!
//! Exclusive, in-memory claim on the next slot of a block.
//!
//! A reservation holds the block's lease for its whole lifetime: a second
//! `reserve` on the same block waits until this one is committed, rolled
//! back or dropped. Nothing is persisted until commit, so a crash or a
//! dropped reservation leaves the cursor where it was.

use super::entities::{BlockId, Timestamp};
use tokio::sync::OwnedMutexGuard;

/// Pending claim on slot `index` of `block_id`.
///
/// Not `Clone`: settling a reservation consumes it.
pub struct Reservation {
    pub(crate) block_id: BlockId,
    pub(crate) index: u32,
    pub(crate) serial: String,
    pub(crate) reserved_at: Timestamp,
    pub(crate) settled: bool,
    pub(crate) _lease: OwnedMutexGuard<()>,
}

impl Reservation {
    pub(crate) fn new(
        block_id: BlockId,
        index: u32,
        serial: String,
        reserved_at: Timestamp,
        lease: OwnedMutexGuard<()>,
    ) -> Self {
        Self {
            block_id,
            index,
            serial,
            reserved_at,
            settled: false,
            _lease: lease,
        }
    }

    /// Reserved block.
    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    /// Reserved slot.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Serial the slot renders to.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// When the lease was taken.
    pub fn reserved_at(&self) -> Timestamp {
        self.reserved_at
    }

    pub(crate) fn settle(&mut self) {
        self.settled = true;
    }
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("block_id", &self.block_id)
            .field("index", &self.index)
            .field("serial", &self.serial)
            .field("reserved_at", &self.reserved_at)
            .finish()
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(
                "[rx-02] Reservation {} of block {} dropped without commit or rollback; slot released",
                self.serial,
                self.block_id
            );
        }
    }
}
