//! # Ports Layer
//!
//! - `inbound` - APIs the ledger exposes (registry, allocator, prescription log)
//! - `outbound` - Dependencies it requires (key-value store, clock)

pub mod inbound;
pub mod outbound;

pub use inbound::{BlockRegistryApi, PrescriptionLogApi, SerialAllocatorApi};
pub use outbound::{KeyValueStore, SystemTimeSource, TimeSource};
