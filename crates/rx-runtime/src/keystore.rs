//! # Vault Key Resolution
//!
//! The vault key comes from `RX_VAULT_KEY` when set: 64 hex characters are
//! taken as the raw key, anything else as a passphrase. Otherwise a device
//! key is read from `<data_dir>/vault.key`, generated on first use.

use rx_01_credential_vault::{SecretKey, VaultError};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Device key file name inside the data directory.
pub const KEY_FILE: &str = "vault.key";

/// Key resolution errors.
#[derive(Debug, Error)]
pub enum KeystoreError {
    /// Key file could not be read or written.
    #[error("Key file {path}: {source}")]
    Io {
        /// Key file path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// Key file exists but does not hold a valid key.
    #[error("Key file {path} is malformed: {source}")]
    Malformed {
        /// Key file path.
        path: PathBuf,
        /// Decoding error.
        source: VaultError,
    },
}

/// Where the key came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeySource {
    /// `RX_VAULT_KEY` as raw hex.
    EnvHex,
    /// `RX_VAULT_KEY` as a passphrase.
    EnvPassphrase,
    /// Existing device key file.
    DeviceFile,
    /// Device key file created by this call.
    Generated,
}

/// Resolve the vault key.
pub fn resolve_key(
    env_key: Option<&str>,
    data_dir: &Path,
) -> Result<(SecretKey, KeySource), KeystoreError> {
    if let Some(material) = env_key {
        let material = material.trim();
        if material.len() == 64 {
            if let Ok(key) = SecretKey::from_hex(material) {
                return Ok((key, KeySource::EnvHex));
            }
        }
        return Ok((SecretKey::from_passphrase(material), KeySource::EnvPassphrase));
    }

    let path = data_dir.join(KEY_FILE);
    match fs::read_to_string(&path) {
        Ok(contents) => {
            let key = SecretKey::from_hex(contents.trim())
                .map_err(|source| KeystoreError::Malformed { path: path.clone(), source })?;
            Ok((key, KeySource::DeviceFile))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let key = SecretKey::generate();
            write_key_file(&path, &key).map_err(|source| KeystoreError::Io {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "[rx-runtime] Generated device vault key");
            Ok((key, KeySource::Generated))
        }
        Err(source) => Err(KeystoreError::Io { path, source }),
    }
}

fn write_key_file(path: &Path, key: &SecretKey) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(key.to_hex().as_bytes())?;
    file.sync_all()
}
