//! # Credential Vault
//!
//! String-level encryption of a block's source-document password.
//!
//! ## Ciphertext Format
//!
//! ```text
//! xc1:<hex(nonce[24] || ciphertext || tag[16])>
//! ```
//!
//! The tag prefix versions the format so a future key scheme can coexist
//! with stored ciphertexts.

use crate::symmetric::{self, Nonce, SecretKey, NONCE_LEN};
use crate::VaultError;
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Version tag prepended to every ciphertext.
pub const CIPHERTEXT_TAG: &str = "xc1:";

/// A decrypted source-document password.
///
/// Zeroized on drop and never printed by `Debug`.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    inner: String,
}

impl Credential {
    /// Wrap a plaintext password.
    pub fn new(plaintext: impl Into<String>) -> Self {
        Self {
            inner: plaintext.into(),
        }
    }

    /// The empty credential ("no password").
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no password is present.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Borrow the plaintext. Use immediately and let go.
    pub fn expose(&self) -> &str {
        &self.inner
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.inner.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(***)")
        }
    }
}

/// Process-wide vault holding the encryption key.
pub struct CredentialVault {
    key: SecretKey,
}

impl CredentialVault {
    /// Create a vault over the given key.
    pub fn new(key: SecretKey) -> Self {
        Self { key }
    }

    /// Encrypt a plaintext password.
    ///
    /// Empty input yields an empty ciphertext.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let (ciphertext, nonce) = symmetric::encrypt(&self.key, plaintext.as_bytes())?;

        let mut framed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        framed.extend_from_slice(nonce.as_bytes());
        framed.extend_from_slice(&ciphertext);

        Ok(format!("{}{}", CIPHERTEXT_TAG, hex::encode(framed)))
    }

    /// Decrypt a stored ciphertext, reporting why it failed.
    ///
    /// Empty input yields an empty credential.
    pub fn try_decrypt(&self, ciphertext: &str) -> Result<Credential, VaultError> {
        if ciphertext.is_empty() {
            return Ok(Credential::empty());
        }

        let encoded = ciphertext
            .strip_prefix(CIPHERTEXT_TAG)
            .ok_or_else(|| VaultError::MalformedCiphertext("missing version tag".to_string()))?;

        let framed =
            hex::decode(encoded).map_err(|e| VaultError::MalformedCiphertext(e.to_string()))?;

        if framed.len() <= NONCE_LEN {
            return Err(VaultError::MalformedCiphertext(format!(
                "{} bytes is shorter than a nonce and tag",
                framed.len()
            )));
        }

        let (nonce_bytes, body) = framed.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);

        let mut plaintext = symmetric::decrypt(&self.key, body, &Nonce::from_bytes(nonce))?;
        let result = String::from_utf8(plaintext.clone())
            .map(Credential::new)
            .map_err(|_| VaultError::InvalidUtf8);
        plaintext.zeroize();
        result
    }

    /// Decrypt a stored ciphertext.
    ///
    /// Never fails: any error degrades to an empty credential. A non-empty
    /// ciphertext that decrypts to empty means "no usable credential".
    pub fn decrypt(&self, ciphertext: &str) -> Credential {
        match self.try_decrypt(ciphertext) {
            Ok(credential) => credential,
            Err(e) => {
                warn!("[rx-01] credential decryption failed: {}", e);
                Credential::empty()
            }
        }
    }

    /// Whether a stored ciphertext represents a password at all.
    ///
    /// Display-only: does not decrypt.
    pub fn is_protected(ciphertext: &str) -> bool {
        !ciphertext.is_empty()
    }
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> CredentialVault {
        CredentialVault::new(SecretKey::from_bytes([7u8; 32]))
    }

    #[test]
    fn test_roundtrip() {
        let vault = vault();
        for plaintext in ["", "a", "pässwörd", "with spaces and symbols !@#"] {
            let ciphertext = vault.encrypt(plaintext).unwrap();
            assert_eq!(vault.decrypt(&ciphertext).expose(), plaintext);
        }
    }

    #[test]
    fn test_empty_maps_to_empty() {
        let vault = vault();
        assert_eq!(vault.encrypt("").unwrap(), "");
        assert!(vault.decrypt("").is_empty());
        assert!(!CredentialVault::is_protected(""));
    }

    #[test]
    fn test_ciphertext_is_tagged_and_not_plaintext() {
        let vault = vault();
        let ciphertext = vault.encrypt("hunter2").unwrap();
        assert!(ciphertext.starts_with(CIPHERTEXT_TAG));
        assert!(!ciphertext.contains("hunter2"));
        assert!(CredentialVault::is_protected(&ciphertext));
    }

    #[test]
    fn test_same_plaintext_encrypts_differently() {
        let vault = vault();
        let a = vault.encrypt("hunter2").unwrap();
        let b = vault.encrypt("hunter2").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_mismatch_degrades_to_empty() {
        let ciphertext = vault().encrypt("hunter2").unwrap();
        let other = CredentialVault::new(SecretKey::from_bytes([9u8; 32]));

        assert!(other.decrypt(&ciphertext).is_empty());
        assert!(matches!(
            other.try_decrypt(&ciphertext),
            Err(VaultError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_corrupt_ciphertext_degrades_to_empty() {
        let vault = vault();
        assert!(vault.decrypt("not-a-ciphertext").is_empty());
        assert!(vault.decrypt("xc1:zz").is_empty());
        assert!(vault.decrypt("xc1:0011").is_empty());
        assert!(matches!(
            vault.try_decrypt("U2FsdGVkX1+legacy"),
            Err(VaultError::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("hunter2");
        assert_eq!(format!("{:?}", credential), "Credential(***)");
        assert_eq!(format!("{:?}", Credential::empty()), "Credential(<empty>)");
    }
}
