//! # Inbound Ports (Driving Ports)
//!
//! The public API of the Block Ledger: registry, allocator and prescription
//! log. Implementations must enforce every domain invariant before a write
//! reaches storage.

use crate::domain::entities::{Block, BlockId, IssuedEntry, NewBlock, Prescription, PrescriptionId};
use crate::domain::errors::LedgerError;
use crate::domain::reservation::Reservation;
use crate::domain::value_objects::QuarantinedBlock;
use async_trait::async_trait;

/// Persisted collection of blocks.
#[async_trait]
pub trait BlockRegistryApi: Send + Sync {
    /// Every block, newest import first. Quarantined blocks included.
    async fn get_all(&self) -> Vec<Block>;

    /// Block by id.
    async fn get(&self, id: &BlockId) -> Option<Block>;

    /// Validate and register a freshly imported block.
    ///
    /// The prefix is trimmed and upper-cased; the cursor starts at 0.
    ///
    /// ## Errors
    ///
    /// - `Validation`: blank source, empty or unrenderable prefix, zero capacity
    async fn import(&self, new_block: NewBlock) -> Result<Block, LedgerError>;

    /// Register a fully formed block.
    ///
    /// If the block is flagged active, every other block is deactivated in
    /// the same write.
    ///
    /// ## Errors
    ///
    /// - `Validation`: the block violates an invariant
    /// - `BlockExists`: the id is taken
    async fn add(&self, block: Block) -> Result<Block, LedgerError>;

    /// Apply user-editable changes (the label).
    ///
    /// Ledger-controlled fields (`cursor`, `journal`, `active`) keep their
    /// stored values regardless of what the caller passes.
    ///
    /// ## Errors
    ///
    /// - `BlockNotFound`
    /// - `ImmutableField`: an import-time field differs from the stored one
    async fn update(&self, block: Block) -> Result<Block, LedgerError>;

    /// Delete a block. Terminal and irreversible.
    ///
    /// Waits for any in-flight reservation on the block to settle.
    async fn remove(&self, id: &BlockId) -> Result<Block, LedgerError>;

    /// Make `id` the only active block, in a single persisted write.
    ///
    /// ## Errors
    ///
    /// - `BlockNotFound`
    /// - `CapacityExhausted`: the block has no serials left
    /// - `LedgerCorruption`: the block is quarantined
    async fn activate(&self, id: &BlockId) -> Result<Block, LedgerError>;

    /// The active block, if any.
    ///
    /// ## Errors
    ///
    /// - `MultipleActive`: persisted data flags more than one block
    async fn active(&self) -> Result<Option<Block>, LedgerError>;

    /// Blocks excluded from issuance because they failed invariant checks.
    async fn quarantined(&self) -> Vec<QuarantinedBlock>;
}

/// Reserve/commit/rollback protocol over a block's cursor.
#[async_trait]
pub trait SerialAllocatorApi: Send + Sync {
    /// Claim the next slot without touching persisted state.
    ///
    /// Concurrent calls for the same block queue on the block's lease.
    ///
    /// ## Errors
    ///
    /// - `BlockNotFound`
    /// - `CapacityExhausted`: `cursor == capacity`
    /// - `LedgerCorruption`: the block is quarantined
    /// - `BlockBusy`: lease not acquired within the configured wait
    async fn reserve(&self, id: &BlockId) -> Result<Reservation, LedgerError>;

    /// Persist `cursor = index + 1` and append the journal entry in one write.
    ///
    /// Committing a slot already in the journal returns the recorded entry
    /// without writing.
    async fn commit(&self, reservation: Reservation) -> Result<IssuedEntry, LedgerError>;

    /// Discard a reservation. No persisted state changes.
    fn rollback(&self, reservation: Reservation);

    /// Manual cursor override, clamped to `[0, capacity]`.
    ///
    /// ## Errors
    ///
    /// - `CursorBelowJournal`: the clamped value is below an issued slot
    async fn set_cursor(&self, id: &BlockId, new_index: i64) -> Result<Block, LedgerError>;

    /// Serial that slot `index` of the block renders to.
    async fn preview_serial(&self, id: &BlockId, index: u32) -> Result<String, LedgerError>;
}

/// Persisted history of issued prescriptions.
#[async_trait]
pub trait PrescriptionLogApi: Send + Sync {
    /// Append a record.
    async fn record(&self, prescription: Prescription) -> Result<(), LedgerError>;

    /// Record by id.
    async fn get(&self, id: &PrescriptionId) -> Result<Prescription, LedgerError>;

    /// All records, newest first.
    async fn list(&self) -> Vec<Prescription>;

    /// Case-insensitive match on patient name, serial or medication.
    async fn search(&self, query: &str) -> Vec<Prescription>;
}
