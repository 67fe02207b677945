//! # Symmetric Encryption
//!
//! XChaCha20-Poly1305 authenticated encryption.
//!
//! ## Security Properties
//!
//! - 192-bit random nonce per message, safe to generate without a counter
//! - Poly1305 tag: tampering or a wrong key fails decryption

use crate::VaultError;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key length in bytes.
pub const KEY_LEN: usize = 32;

/// Nonce length in bytes (XChaCha20).
pub const NONCE_LEN: usize = 24;

/// Secret key (256-bit).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, VaultError> {
        if bytes.len() != KEY_LEN {
            return Err(VaultError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: bytes.len(),
            });
        }
        let mut inner = [0u8; KEY_LEN];
        inner.copy_from_slice(bytes);
        Ok(Self(inner))
    }

    /// Decode a 64-character hex key.
    pub fn from_hex(encoded: &str) -> Result<Self, VaultError> {
        let mut bytes = hex::decode(encoded.trim())
            .map_err(|e| VaultError::InvalidKeyEncoding(e.to_string()))?;
        let key = Self::from_slice(&bytes);
        bytes.zeroize();
        key
    }

    /// Derive a key from a passphrase (SHA-256).
    ///
    /// Only suitable for high-entropy device secrets, not user passwords.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut inner = [0u8; KEY_LEN];
        inner.copy_from_slice(&digest);
        Self(inner)
    }

    /// Generate random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Hex encoding, for persisting the key in a device keystore file.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

/// Nonce for encryption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

/// Encrypt plaintext with XChaCha20-Poly1305.
///
/// Returns (ciphertext, nonce).
///
/// # Errors
///
/// Returns `VaultError::EncryptionFailed` if encryption fails.
pub fn encrypt(key: &SecretKey, plaintext: &[u8]) -> Result<(Vec<u8>, Nonce), VaultError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let nonce = Nonce::generate();

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(nonce.as_bytes()), plaintext)
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

    Ok((ciphertext, nonce))
}

/// Decrypt ciphertext with XChaCha20-Poly1305.
///
/// # Errors
///
/// Returns `VaultError::DecryptionFailed` if the tag does not verify.
pub fn decrypt(key: &SecretKey, ciphertext: &[u8], nonce: &Nonce) -> Result<Vec<u8>, VaultError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(XNonce::from_slice(nonce.as_bytes()), ciphertext)
        .map_err(|e| VaultError::DecryptionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = SecretKey::generate();
        let plaintext = b"talonario-2024";

        let (ciphertext, nonce) = encrypt(&key, plaintext).unwrap();
        let decrypted = decrypt(&key, &ciphertext, &nonce).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = SecretKey::generate();
        let key2 = SecretKey::generate();

        let (ciphertext, nonce) = encrypt(&key1, b"secret").unwrap();
        assert!(decrypt(&key2, &ciphertext, &nonce).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = SecretKey::generate();

        let (mut ciphertext, nonce) = encrypt(&key, b"secret").unwrap();
        ciphertext[0] ^= 0xFF;

        assert!(decrypt(&key, &ciphertext, &nonce).is_err());
    }

    #[test]
    fn test_hex_roundtrip() {
        let key = SecretKey::generate();
        let restored = SecretKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key.as_bytes(), restored.as_bytes());
    }

    #[test]
    fn test_from_hex_rejects_short_key() {
        let err = SecretKey::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            VaultError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: 2
            }
        );
    }

    #[test]
    fn test_passphrase_derivation_is_deterministic() {
        let a = SecretKey::from_passphrase("device-secret");
        let b = SecretKey::from_passphrase("device-secret");
        let c = SecretKey::from_passphrase("other-secret");
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn test_debug_hides_key() {
        let key = SecretKey::from_bytes([0xAB; KEY_LEN]);
        let debug = format!("{:?}", key);
        assert!(!debug.to_lowercase().contains("ab"));
    }

    #[test]
    fn test_nonce_uniqueness() {
        let n1 = Nonce::generate();
        let n2 = Nonce::generate();
        assert_ne!(n1.as_bytes(), n2.as_bytes());
    }
}
