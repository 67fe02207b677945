//! # Block Ledger (rx-02)
//!
//! Authoritative record of imported prescription blocks and of every serial
//! issued from them.
//!
//! ## Two-phase issuance
//!
//! ```text
//! reserve(block) ──► Reservation{index = cursor}   (lease held, nothing written)
//!        │
//!        ├── commit   ──► cursor = index + 1, journal += entry   (one write)
//!        └── rollback ──► discard; the index is handed out again
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Cursor Bounds | `0 <= cursor <= capacity` |
//! | 2 | Journal Consistency | `len(journal) <= cursor`, distinct indices below the cursor |
//! | 3 | Serial Determinism | serial is a pure, injective, monotonic function of the index |
//! | 4 | Single Active | at most one block has `active = true` |
//! | 5 | Credential Stability | the stored ciphertext is only ever set at import |
//!
//! Blocks loaded in violation of 1-3 are quarantined: listed, but never
//! reserved or activated.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Entities, journal, serial schemes, invariants
//! - `ports/` - Inbound APIs and outbound SPI (key-value store, clock)
//! - `adapters/` - In-memory and file-backed stores, data directory lock
//! - `service/` - Registry, allocator and prescription log
//!
//! ## Usage
//!
//! ```ignore
//! use rx_02_block_ledger::*;
//!
//! let ledger = LedgerService::open(InMemoryKVStore::new(), LedgerConfig::default(),
//!     Arc::new(SystemTimeSource)).await?;
//! let block = ledger.registry().import(new_block).await?;
//! let reservation = ledger.allocator().reserve(&block.id).await?;
//! let entry = ledger.allocator().commit(reservation).await?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::storage::{FileKVStore, InMemoryKVStore};
#[cfg(feature = "locking")]
pub use adapters::{DatabaseLock, LockError};
pub use domain::entities::{
    Block, BlockId, DocumentRef, IssuedEntry, NewBlock, PatientData, Prescription,
    PrescriptionId, SourceRef, Timestamp,
};
pub use domain::errors::{KVStoreError, LedgerError};
pub use domain::journal::Journal;
pub use domain::reservation::Reservation;
pub use domain::serial::{serial, SerialScheme};
pub use domain::value_objects::{
    LedgerConfig, LedgerStats, QuarantinedBlock, StorageKeys, DEFAULT_RESERVE_WAIT,
};
pub use ports::inbound::{BlockRegistryApi, PrescriptionLogApi, SerialAllocatorApi};
pub use ports::outbound::{KeyValueStore, SystemTimeSource, TimeSource};
pub use service::{BlockRegistry, LedgerService, PrescriptionLog, SerialAllocator};
