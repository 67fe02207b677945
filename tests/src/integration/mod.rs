//! Cross-subsystem integration tests.

pub mod concurrency;
pub mod issuance_flow;
pub mod persistence;
