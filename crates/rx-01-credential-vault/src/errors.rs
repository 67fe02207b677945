//! Vault error types.

use thiserror::Error;

/// Credential vault errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (tampered ciphertext or wrong key)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Ciphertext string is not in the vault format
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Key material could not be decoded
    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// Decrypted bytes are not valid UTF-8
    #[error("Decrypted credential is not valid UTF-8")]
    InvalidUtf8,
}
