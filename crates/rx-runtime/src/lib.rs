//! # Rx-Ledger Runtime
//!
//! Wires the subsystems into a device-local ledger:
//!
//! - `config` - `RX_*` environment configuration
//! - `logging` - tracing subscriber setup
//! - `keystore` - vault key resolution (environment or device key file)
//! - `container` - data-directory lock, file store, ledger and vault
//! - `cli` - the `rx-ledger` administration commands

pub mod cli;
pub mod config;
pub mod container;
pub mod keystore;
pub mod logging;

pub use config::{ConfigError, RuntimeConfig};
pub use container::{IntegrityReport, LedgerContainer};
pub use keystore::{resolve_key, KeySource, KeystoreError};
pub use logging::init_tracing;
