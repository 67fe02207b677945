//! # Credential Vault (rx-01)
//!
//! At-rest protection for the password of a block's source document.
//!
//! ## Components
//!
//! | Module | Contents | Use Case |
//! |--------|----------|----------|
//! | `symmetric` | XChaCha20-Poly1305, `SecretKey`, `Nonce` | Authenticated encryption |
//! | `vault` | `CredentialVault`, `Credential` | String-level encrypt/decrypt |
//! | `errors` | `VaultError` | Failure reasons |
//!
//! ## Contract
//!
//! - `encrypt("")` is `""`, and `decrypt("")` is an empty credential.
//! - `decrypt` never fails: corrupt ciphertext or a key mismatch yields an
//!   empty credential. Callers holding a non-empty ciphertext must treat an
//!   empty result as "no usable credential", never as "unprotected".
//! - `try_decrypt` exposes the failure reason for callers that need it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod symmetric;
pub mod vault;

// Re-exports
pub use errors::VaultError;
pub use symmetric::{decrypt, encrypt, Nonce, SecretKey};
pub use vault::{Credential, CredentialVault, CIPHERTEXT_TAG};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
