//! # Ledger Container
//!
//! Wires the on-disk ledger: data-directory lock, file store, vault key and
//! `LedgerService`. Holds the lock for as long as it lives.

use crate::config::RuntimeConfig;
use crate::keystore::{resolve_key, KeySource};
use anyhow::Context;
use rx_01_credential_vault::{CredentialVault, SecretKey};
use rx_02_block_ledger::{
    BlockId, BlockRegistryApi, DatabaseLock, FileKVStore, LedgerError, LedgerService,
    QuarantinedBlock, SystemTimeSource,
};
use rx_03_issuance::{DocumentComposer, IssuanceWorkflow, SyncRelay};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Store sub-directory under the data directory.
pub const STORE_DIR: &str = "store";

/// Opened ledger plus the resources it depends on.
pub struct LedgerContainer {
    ledger: Arc<LedgerService<FileKVStore>>,
    key: SecretKey,
    key_source: KeySource,
    config: RuntimeConfig,
    _lock: DatabaseLock,
}

impl LedgerContainer {
    /// Lock the data directory and load the ledger.
    pub async fn open(config: RuntimeConfig) -> anyhow::Result<Self> {
        let data_dir = config.data_dir.clone();
        let lock = DatabaseLock::acquire(&data_dir)
            .with_context(|| format!("Failed to lock data directory {}", data_dir.display()))?;

        let (key, key_source) = resolve_key(config.vault_key.as_deref(), &data_dir)
            .context("Failed to resolve vault key")?;

        let store = FileKVStore::new(data_dir.join(STORE_DIR));
        let ledger = LedgerService::open(store, config.ledger.clone(), Arc::new(SystemTimeSource))
            .await
            .context("Failed to open block ledger")?;

        info!(
            data_dir = %data_dir.display(),
            key_source = ?key_source,
            "[rx-runtime] Ledger opened"
        );

        Ok(Self {
            ledger: Arc::new(ledger),
            key,
            key_source,
            config,
            _lock: lock,
        })
    }

    /// The ledger.
    pub fn ledger(&self) -> &Arc<LedgerService<FileKVStore>> {
        &self.ledger
    }

    /// A vault over the resolved key.
    pub fn vault(&self) -> CredentialVault {
        CredentialVault::new(self.key.clone())
    }

    /// Where the vault key came from.
    pub fn key_source(&self) -> KeySource {
        self.key_source
    }

    /// Data directory.
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Issuance workflow over this ledger with the given collaborators.
    pub fn workflow<C: DocumentComposer>(
        &self,
        composer: Arc<C>,
        relay: Arc<dyn SyncRelay>,
    ) -> IssuanceWorkflow<FileKVStore, C> {
        IssuanceWorkflow::new(
            self.ledger.clone(),
            self.vault(),
            composer,
            relay,
            self.config.issuance.clone(),
        )
    }

    /// Check persisted data for problems that block issuance.
    pub async fn verify(&self) -> IntegrityReport {
        let registry = self.ledger.registry();
        let quarantined = registry.quarantined().await;

        let multiple_active = match registry.active().await {
            Err(LedgerError::MultipleActive { block_ids }) => block_ids,
            _ => Vec::new(),
        };

        let vault = self.vault();
        let undecryptable = registry
            .get_all()
            .await
            .into_iter()
            .filter(|block| !block.encrypted_credential.is_empty())
            .filter(|block| vault.try_decrypt(&block.encrypted_credential).is_err())
            .map(|block| block.id)
            .collect::<Vec<_>>();

        if !undecryptable.is_empty() {
            warn!(
                count = undecryptable.len(),
                "[rx-runtime] Stored credentials do not decrypt under the current key"
            );
        }

        IntegrityReport {
            data_dir: self.config.data_dir.clone(),
            quarantined,
            multiple_active,
            undecryptable,
        }
    }
}

/// Result of [`LedgerContainer::verify`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    /// Checked data directory.
    pub data_dir: PathBuf,
    /// Blocks excluded from issuance.
    pub quarantined: Vec<QuarantinedBlock>,
    /// Blocks flagged active together, if more than one.
    pub multiple_active: Vec<BlockId>,
    /// Blocks whose stored credential fails to decrypt.
    pub undecryptable: Vec<BlockId>,
}

impl IntegrityReport {
    /// No problems found.
    pub fn is_clean(&self) -> bool {
        self.quarantined.is_empty() && self.multiple_active.is_empty() && self.undecryptable.is_empty()
    }
}
