//! # Issuance Workflow (rx-03)
//!
//! Issues prescriptions from the active block: reserves the next serial,
//! has the document collaborator compose and sign the form, then commits.
//!
//! ## Error Taxonomy
//!
//! | Error | Cause | Slot |
//! |-------|-------|------|
//! | `Validation` | blank required field, bad import parameters | untouched |
//! | `NoEligibleBlock` | no active block, or it is exhausted | untouched |
//! | `CapacityExhausted` | reserve against a full block | untouched |
//! | `CredentialDecryptionFailure` | stored password unusable | rolled back |
//! | `CompositionFailure` / `SigningFailure` | collaborator error or timeout | rolled back |
//! | `LedgerCorruption` | quarantined block | untouched |
//!
//! ## Crate Structure
//!
//! - `domain/` - Errors, events, configuration
//! - `ports/` - `IssuanceApi`, `DocumentComposer`, `SyncRelay`
//! - `adapters/` - Relays and the scriptable composer
//! - `service.rs` - `IssuanceWorkflow`

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{BroadcastSyncRelay, NoopSyncRelay, OfflineComposer, RecordingSyncRelay};
#[cfg(any(test, feature = "test-utils"))]
pub use adapters::{ComposerCall, MockDocumentComposer};
pub use domain::{FormFields, ImportRequest, IssuanceConfig, IssuanceError, LedgerEvent};
pub use ports::{ComposerError, DocumentComposer, IssuanceApi, SyncRelay};
pub use service::IssuanceWorkflow;
