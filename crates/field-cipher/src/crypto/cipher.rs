//! AES-256-GCM encryption and decryption of individual note fields.
//!
//! Every call derives the key from a passphrase (the caller's, or the process
//! default), so any client configured with the same passphrase can read what
//! another wrote.
//!
//! **Never reuse a nonce under the same key.** The nonce is drawn fresh from the
//! [`NonceSource`] on every encryption; GCM nonce reuse breaks both
//! confidentiality and authentication.

use std::sync::Arc;

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::envelope::{Envelope, PassThrough, NONCE_LEN};
use super::kdf::{derive_key_async, DerivedKey, KdfParams, KeyDerivationError};
use super::key_cache::{fingerprint, KeyCache};
use crate::passphrase::{Passphrase, PassphraseError, PassphraseStore};

/// Errors that abort an encryption. The field must not be stored.
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// The key could not be derived.
    #[error("key derivation failed: {0}")]
    KeyDerivation(#[from] KeyDerivationError),

    /// The OS random source failed to produce a nonce.
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    /// AES-GCM refused to seal the message.
    #[error("aead operation failed")]
    Aead,

    /// No passphrase was passed and no default is configured.
    #[error("no passphrase supplied and no default configured")]
    NoPassphrase,
}

/// Reasons an envelope failed to open. Absorbed into [`PassThrough::Undecryptable`].
#[derive(Debug, Error)]
enum OpenError {
    #[error("no passphrase supplied and no default configured")]
    NoPassphrase,

    #[error("key derivation failed: {0}")]
    KeyDerivation(#[from] KeyDerivationError),

    #[error("authentication failed")]
    Authentication,
}

/// Source of per-encryption nonces.
#[cfg_attr(test, mockall::automock)]
pub trait NonceSource: Send + Sync {
    /// Fill `nonce` with fresh random bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::Entropy`] if no randomness is available.
    fn fill_nonce(&self, nonce: &mut [u8; NONCE_LEN]) -> Result<(), EncryptionError>;
}

/// [`NonceSource`] backed by the OS CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsNonceSource;

impl NonceSource for OsNonceSource {
    fn fill_nonce(&self, nonce: &mut [u8; NONCE_LEN]) -> Result<(), EncryptionError> {
        OsRng
            .try_fill_bytes(nonce)
            .map_err(|e| EncryptionError::Entropy(e.to_string()))
    }
}

/// Result of [`FieldCipher::decrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decrypted {
    /// The field was an envelope and authenticated.
    Recovered(String),
    /// The field is returned exactly as given.
    PassedThrough {
        /// The original input.
        text: String,
        /// Why it was not decrypted.
        reason: PassThrough,
    },
}

impl Decrypted {
    fn passed_through(input: &str, reason: PassThrough) -> Self {
        Decrypted::PassedThrough {
            text: input.to_owned(),
            reason,
        }
    }

    /// The text to display: plaintext if recovered, otherwise the input.
    pub fn text(&self) -> &str {
        match self {
            Decrypted::Recovered(text) | Decrypted::PassedThrough { text, .. } => text,
        }
    }

    /// Consume the result, yielding what [`Decrypted::text`] would show.
    pub fn into_text(self) -> String {
        match self {
            Decrypted::Recovered(text) | Decrypted::PassedThrough { text, .. } => text,
        }
    }

    /// Whether the field was an envelope that authenticated.
    pub fn is_recovered(&self) -> bool {
        matches!(self, Decrypted::Recovered(_))
    }

    /// The pass-through reason, or `None` if the field was recovered.
    pub fn pass_through_reason(&self) -> Option<PassThrough> {
        match self {
            Decrypted::Recovered(_) => None,
            Decrypted::PassedThrough { reason, .. } => Some(*reason),
        }
    }
}

/// Encrypts and decrypts note fields.
///
/// Cheap to clone; all state is `Arc`-backed and immutable apart from the
/// default passphrase, which lives behind [`PassphraseStore`].
#[derive(Clone)]
pub struct FieldCipher {
    params: Arc<KdfParams>,
    default_passphrase: PassphraseStore,
    nonces: Arc<dyn NonceSource>,
    keys: Option<KeyCache>,
}

impl FieldCipher {
    /// Build a cipher with the OS nonce source and no key cache.
    pub fn new(params: KdfParams, default_passphrase: PassphraseStore) -> Self {
        Self {
            params: Arc::new(params),
            default_passphrase,
            nonces: Arc::new(OsNonceSource),
            keys: None,
        }
    }

    /// Replace the nonce source.
    pub fn with_nonce_source(mut self, nonces: Arc<dyn NonceSource>) -> Self {
        self.nonces = nonces;
        self
    }

    /// Cache derived keys instead of re-running PBKDF2 on every call.
    pub fn with_key_cache(mut self, cache: KeyCache) -> Self {
        self.keys = Some(cache);
        self
    }

    /// Salt and round count every key is derived with.
    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Replace the default passphrase and forget any cached keys.
    ///
    /// # Errors
    ///
    /// Returns [`PassphraseError::Empty`] if `passphrase` is empty.
    pub async fn rotate_passphrase(&self, passphrase: &str) -> Result<(), PassphraseError> {
        self.default_passphrase.rotate(passphrase).await?;
        if let Some(cache) = &self.keys {
            cache.clear();
        }
        Ok(())
    }

    /// Encrypt `plaintext` into a base64 envelope.
    ///
    /// An empty `plaintext` returns an empty string without touching the key or
    /// the random source. `passphrase` overrides the default when given.
    ///
    /// # Errors
    ///
    /// Returns an [`EncryptionError`] if no passphrase is available, the key
    /// cannot be derived, no nonce can be drawn, or AES-GCM fails. The caller
    /// must abort the save; there is no plaintext fallback.
    pub async fn encrypt(
        &self,
        plaintext: &str,
        passphrase: Option<&str>,
    ) -> Result<String, EncryptionError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let passphrase = self
            .resolve(passphrase)
            .await
            .map_err(|_| EncryptionError::NoPassphrase)?;
        let key = self.key_for(passphrase).await?;

        let mut nonce = [0u8; NONCE_LEN];
        self.nonces.fill_nonce(&mut nonce)?;

        let sealed = build_cipher(&key)
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| EncryptionError::Aead)?;

        Ok(Envelope { nonce, sealed }.encode())
    }

    /// Decrypt `input`, or hand it back unchanged if it is not a readable envelope.
    ///
    /// Never fails: legacy plaintext, short base64-looking words, tampered data
    /// and wrong-key envelopes all come back as [`Decrypted::PassedThrough`].
    pub async fn decrypt(&self, input: &str, passphrase: Option<&str>) -> Decrypted {
        let envelope = match Envelope::classify(input) {
            Ok(envelope) => envelope,
            Err(reason) => {
                debug!(
                    reason = reason.as_str(),
                    len = input.len(),
                    "field passed through unchanged"
                );
                return Decrypted::passed_through(input, reason);
            }
        };

        match self.open(&envelope, passphrase).await {
            Ok(text) => Decrypted::Recovered(text),
            Err(e) => {
                warn!(
                    reason = PassThrough::Undecryptable.as_str(),
                    error = %e,
                    len = input.len(),
                    "envelope did not decrypt; field passed through unchanged"
                );
                Decrypted::passed_through(input, PassThrough::Undecryptable)
            }
        }
    }

    /// [`FieldCipher::decrypt`] collapsed to the displayed string.
    pub async fn decrypt_text(&self, input: &str, passphrase: Option<&str>) -> String {
        self.decrypt(input, passphrase).await.into_text()
    }

    async fn open(
        &self,
        envelope: &Envelope,
        passphrase: Option<&str>,
    ) -> Result<String, OpenError> {
        let passphrase = self
            .resolve(passphrase)
            .await
            .map_err(|_| OpenError::NoPassphrase)?;
        let key = self.key_for(passphrase).await?;

        let plain = build_cipher(&key)
            .decrypt(
                Nonce::from_slice(&envelope.nonce),
                envelope.sealed.as_slice(),
            )
            .map(Zeroizing::new)
            .map_err(|_| OpenError::Authentication)?;

        Ok(String::from_utf8_lossy(&plain).into_owned())
    }

    async fn resolve(&self, passphrase: Option<&str>) -> Result<Passphrase, PassphraseError> {
        match passphrase {
            Some(p) => Ok(Passphrase::from(p)),
            None => self.default_passphrase.current().await,
        }
    }

    async fn key_for(&self, passphrase: Passphrase) -> Result<Arc<DerivedKey>, KeyDerivationError> {
        let Some(cache) = &self.keys else {
            return derive_key_async(passphrase, self.params.clone())
                .await
                .map(Arc::new);
        };

        let fp = fingerprint(&self.params, &passphrase);
        if let Some(key) = cache.get(&fp) {
            return Ok(key);
        }
        let key = Arc::new(derive_key_async(passphrase, self.params.clone()).await?);
        cache.insert(fp, key.clone());
        Ok(key)
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher")
            .field("iterations", &self.params.iterations)
            .field("key_cache", &self.keys)
            .finish_non_exhaustive()
    }
}

fn build_cipher(key: &DerivedKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}
