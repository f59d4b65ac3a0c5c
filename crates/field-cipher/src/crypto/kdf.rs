//! PBKDF2-HMAC-SHA256 derivation of the field key from a passphrase.
//!
//! The salt is static and shared by every client: two processes configured with
//! the same passphrase derive the same key without exchanging anything. All of
//! the security therefore rests on the secrecy of the passphrase.

use std::sync::Arc;

use hmac::Hmac;
use sha2::Sha256;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::passphrase::Passphrase;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Salt used by every note ever written. Changing it orphans all stored envelopes.
pub const DEFAULT_SALT: &str = "note-app-salt-2024";

/// PBKDF2 round count used by every note ever written.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Errors produced while deriving a key.
#[derive(Debug, Error)]
pub enum KeyDerivationError {
    /// PBKDF2 with zero rounds is undefined.
    #[error("PBKDF2 iteration count must be > 0")]
    ZeroIterations,

    /// The PRF rejected the key material.
    #[error("PBKDF2 rejected the key material")]
    Primitive,

    /// The blocking derivation task panicked or was cancelled.
    #[error("key derivation task failed: {0}")]
    Worker(String),
}

/// Parameters fixed for the lifetime of a [`crate::FieldCipher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    /// Static salt bytes.
    pub salt: Vec<u8>,
    /// PBKDF2 round count.
    pub iterations: u32,
}

impl KdfParams {
    pub fn new(salt: impl Into<Vec<u8>>, iterations: u32) -> Self {
        Self {
            salt: salt.into(),
            iterations,
        }
    }
}

impl Default for KdfParams {
    /// The parameters existing envelopes were written with.
    fn default() -> Self {
        Self::new(DEFAULT_SALT.as_bytes(), DEFAULT_ITERATIONS)
    }
}

/// A 256-bit AES-GCM key.
///
/// The raw bytes never leave this crate. The buffer is zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive the field key for `passphrase`.
///
/// Deterministic: the same passphrase and parameters always yield the same key.
/// An empty passphrase is accepted.
///
/// # Errors
///
/// Returns [`KeyDerivationError::ZeroIterations`] if `params.iterations` is 0,
/// or [`KeyDerivationError::Primitive`] if the PRF rejects the input.
pub fn derive_key(passphrase: &str, params: &KdfParams) -> Result<DerivedKey, KeyDerivationError> {
    if params.iterations == 0 {
        return Err(KeyDerivationError::ZeroIterations);
    }
    let mut buf = [0u8; KEY_LEN];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(
        passphrase.as_bytes(),
        &params.salt,
        params.iterations,
        &mut buf,
    )
    .map_err(|_| KeyDerivationError::Primitive)?;
    let key = DerivedKey(buf);
    buf.zeroize();
    Ok(key)
}

/// Run [`derive_key`] on the blocking pool.
///
/// 100 000 rounds of HMAC-SHA256 is long enough to stall a runtime worker, so
/// async callers suspend here instead.
pub async fn derive_key_async(
    passphrase: Passphrase,
    params: Arc<KdfParams>,
) -> Result<DerivedKey, KeyDerivationError> {
    tokio::task::spawn_blocking(move || derive_key(passphrase.expose(), &params))
        .await
        .map_err(|e| KeyDerivationError::Worker(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> KdfParams {
        KdfParams::new("test-salt", 1_000)
    }

    #[test]
    fn defaults_match_stored_data() {
        let p = KdfParams::default();
        assert_eq!(p.salt, b"note-app-salt-2024");
        assert_eq!(p.iterations, 100_000);
    }

    #[test]
    fn same_passphrase_same_key() {
        let a = derive_key("correct-horse", &fast()).unwrap();
        let b = derive_key("correct-horse", &fast()).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_passphrase_different_key() {
        let a = derive_key("correct-horse", &fast()).unwrap();
        let b = derive_key("battery-staple", &fast()).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn different_salt_different_key() {
        let a = derive_key("pw", &KdfParams::new("salt-a", 1_000)).unwrap();
        let b = derive_key("pw", &KdfParams::new("salt-b", 1_000)).unwrap();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn matches_pbkdf2_reference_vector() {
        // RFC 7914 section 11: PBKDF2-HMAC-SHA256("passwd", "salt", 1, 64), first 32 bytes.
        let key = derive_key("passwd", &KdfParams::new("salt", 1)).unwrap();
        let expected: [u8; KEY_LEN] = [
            0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f, 0xec, 0x16, 0x91, 0xc2, 0x25, 0x44,
            0xb6, 0x05, 0xf9, 0x41, 0x85, 0x21, 0x6d, 0xde, 0x04, 0x65, 0xe6, 0x8b, 0x9d, 0x57,
            0xc2, 0x0d, 0xac, 0xbc,
        ];
        assert_eq!(key.as_bytes(), &expected);
    }

    #[test]
    fn empty_passphrase_is_accepted() {
        assert!(derive_key("", &fast()).is_ok());
    }

    #[test]
    fn zero_iterations_rejected() {
        let err = derive_key("pw", &KdfParams::new("salt", 0)).unwrap_err();
        assert!(matches!(err, KeyDerivationError::ZeroIterations));
    }

    #[test]
    fn key_is_redacted_in_debug() {
        let key = derive_key("pw", &fast()).unwrap();
        assert_eq!(format!("{key:?}"), "DerivedKey([REDACTED])");
    }

    #[tokio::test]
    async fn async_matches_sync() {
        let params = Arc::new(fast());
        let a = derive_key_async(Passphrase::from("pw"), params.clone())
            .await
            .unwrap();
        let b = derive_key("pw", &params).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }
}
