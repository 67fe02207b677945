//! # Value Objects
//!
//! Workflow configuration and request types.

use rx_01_credential_vault::Credential;
use rx_02_block_ledger::{LedgerConfig, PatientData, SerialScheme, SourceRef};
use std::time::Duration;

/// Issuance workflow configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuanceConfig {
    /// Upper bound on compose + sign (and on other single collaborator
    /// calls). On expiry the reservation is rolled back.
    pub composition_timeout: Duration,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            composition_timeout: Duration::from_secs(120),
        }
    }
}

/// Slack on top of the timed calls for the commit write itself.
pub const LEASE_SLACK: Duration = Duration::from_secs(30);

impl IssuanceConfig {
    /// Set the composition timeout.
    pub fn with_composition_timeout(mut self, timeout: Duration) -> Self {
        self.composition_timeout = timeout;
        self
    }

    /// Longest one `issue` can hold a block's lease: compose and sign, each
    /// under the timeout, then the commit write with its retries.
    pub fn lease_hold_bound(&self, ledger: &LedgerConfig) -> Duration {
        self.composition_timeout
            .saturating_mul(2)
            .saturating_add(ledger.storage_retry_budget())
            .saturating_add(LEASE_SLACK)
    }

    /// Raise the ledger's lease wait so a queued `issue` outlasts the one
    /// ahead of it.
    pub fn align_ledger(&self, ledger: LedgerConfig) -> LedgerConfig {
        let bound = self.lease_hold_bound(&ledger);
        if ledger.reserve_wait >= bound {
            return ledger;
        }
        ledger.with_reserve_wait(bound)
    }
}

/// Parameters for importing a block of forms.
#[derive(Clone, Debug)]
pub struct ImportRequest {
    /// Display name, usually the file name.
    pub label: String,
    /// Source document.
    pub source_ref: SourceRef,
    /// Physical stock prefix.
    pub serial_prefix: String,
    /// Serial rendering scheme.
    pub serial_scheme: SerialScheme,
    /// Number of forms; `None` asks the document service for the page count.
    pub capacity: Option<i64>,
    /// Source document password; empty when unprotected.
    pub password: Credential,
    /// Make the new block the active one.
    pub activate: bool,
}

impl ImportRequest {
    /// Request with the padded scheme, no password and no activation.
    pub fn new(source_ref: SourceRef, serial_prefix: impl Into<String>) -> Self {
        Self {
            label: String::new(),
            source_ref,
            serial_prefix: serial_prefix.into(),
            serial_scheme: SerialScheme::Padded,
            capacity: None,
            password: Credential::empty(),
            activate: false,
        }
    }

    /// Set the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set an explicit capacity.
    pub fn capacity(mut self, capacity: i64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set the serial scheme.
    pub fn scheme(mut self, scheme: SerialScheme) -> Self {
        self.serial_scheme = scheme;
        self
    }

    /// Set the source password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Credential::new(password);
        self
    }

    /// Activate the block after import.
    pub fn activate(mut self, activate: bool) -> Self {
        self.activate = activate;
        self
    }
}

/// Values filled into the reserved form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormFields {
    /// Serial of the reserved slot.
    pub serial: String,
    /// Patient and medication data.
    pub patient: PatientData,
}
