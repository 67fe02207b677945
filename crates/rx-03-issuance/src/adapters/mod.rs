//! # Adapters Module
//!
//! - `relay`: `SyncRelay` implementations (noop, broadcast, recording)
//! - `offline`: `DocumentComposer` for ledger-only tooling
//! - `mock_composer`: scriptable `DocumentComposer` (tests and `test-utils`)

#[cfg(any(test, feature = "test-utils"))]
pub mod mock_composer;
pub mod offline;
pub mod relay;

#[cfg(any(test, feature = "test-utils"))]
pub use mock_composer::{ComposerCall, MockDocumentComposer};
pub use offline::{OfflineComposer, OFFLINE_MESSAGE};
pub use relay::{BroadcastSyncRelay, NoopSyncRelay, RecordingSyncRelay, DEFAULT_RELAY_CAPACITY};
