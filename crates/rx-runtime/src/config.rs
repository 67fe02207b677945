//! # Runtime Configuration
//!
//! Loaded from `RX_*` environment variables; CLI flags override on top.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `RX_DATA_DIR` | `./rx-data` | Ledger data directory |
//! | `RX_VAULT_KEY` | device key file | 64 hex chars, or a passphrase |
//! | `RX_LOG_LEVEL` | `info` | Filter when `RUST_LOG` is unset |
//! | `RX_LOG_JSON` | `false` | JSON log lines |
//! | `RX_STORAGE_RETRIES` | `3` | Attempts per storage operation |
//! | `RX_RESERVE_WAIT_SECS` | `300` | Wait for a busy block; at least 2 x composition timeout |
//! | `RX_COMPOSITION_TIMEOUT_SECS` | `120` | Compose + sign bound |

use rx_02_block_ledger::LedgerConfig;
use rx_03_issuance::IssuanceConfig;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable holds a value that cannot be used.
    #[error("Invalid {var}='{value}': {reason}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
        /// What was expected.
        reason: &'static str,
    },
}

/// Complete runtime configuration.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Ledger data directory.
    pub data_dir: PathBuf,
    /// Vault key material from the environment, if any.
    pub vault_key: Option<String>,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON log lines.
    pub log_json: bool,
    /// Ledger settings.
    pub ledger: LedgerConfig,
    /// Workflow settings.
    pub issuance: IssuanceConfig,
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("data_dir", &self.data_dir)
            .field("vault_key", &self.vault_key.as_ref().map(|_| "<redacted>"))
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .field("ledger", &self.ledger)
            .field("issuance", &self.issuance)
            .finish()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./rx-data"),
            vault_key: None,
            log_level: "info".to_string(),
            log_json: false,
            ledger: LedgerConfig::default(),
            issuance: IssuanceConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("RX_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        config.vault_key = get("RX_VAULT_KEY");
        if let Some(level) = get("RX_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(json) = get("RX_LOG_JSON") {
            config.log_json = parse_bool("RX_LOG_JSON", &json)?;
        }
        if let Some(retries) = get("RX_STORAGE_RETRIES") {
            let attempts = parse_u64("RX_STORAGE_RETRIES", &retries)?;
            let attempts = u32::try_from(attempts).map_err(|_| ConfigError::InvalidValue {
                var: "RX_STORAGE_RETRIES",
                value: retries.clone(),
                reason: "too large",
            })?;
            config.ledger = config.ledger.with_storage_retries(attempts);
        }

        if let Some(timeout) = get("RX_COMPOSITION_TIMEOUT_SECS") {
            let secs = parse_u64("RX_COMPOSITION_TIMEOUT_SECS", &timeout)?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    var: "RX_COMPOSITION_TIMEOUT_SECS",
                    value: timeout,
                    reason: "must be at least 1 second",
                });
            }
            config.issuance = config
                .issuance
                .with_composition_timeout(Duration::from_secs(secs));
        }

        let hold = config.issuance.lease_hold_bound(&config.ledger);
        match get("RX_RESERVE_WAIT_SECS") {
            Some(wait) => {
                let secs = parse_u64("RX_RESERVE_WAIT_SECS", &wait)?;
                if Duration::from_secs(secs) < hold {
                    return Err(ConfigError::InvalidValue {
                        var: "RX_RESERVE_WAIT_SECS",
                        value: wait,
                        reason: "shorter than one issuance can hold a block",
                    });
                }
                config.ledger = config.ledger.with_reserve_wait(Duration::from_secs(secs));
            }
            None => config.ledger = config.issuance.align_ledger(config.ledger),
        }

        Ok(config)
    }
}

fn parse_u64(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: "expected a non-negative integer",
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: "expected true or false",
        }),
    }
}
