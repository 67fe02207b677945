//! # Ports Layer

pub mod inbound;
pub mod outbound;

pub use inbound::IssuanceApi;
pub use outbound::{ComposerError, DocumentComposer, SyncRelay};
