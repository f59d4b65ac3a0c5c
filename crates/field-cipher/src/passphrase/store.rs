//! [`PassphraseStore`]: thread-safe holder for the default passphrase.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Errors produced by the passphrase layer.
#[derive(Debug, Error)]
pub enum PassphraseError {
    /// No default passphrase has been configured.
    #[error("default passphrase not configured")]
    NotInitialised,

    /// An empty string was offered as the default passphrase.
    #[error("default passphrase must not be empty")]
    Empty,
}

/// A passphrase held only as long as a key derivation needs it.
///
/// The buffer is zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the passphrase text.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase([REDACTED])")
    }
}

/// Thread-safe store for the default passphrase.
///
/// Wraps an `Arc<RwLock<Option<Passphrase>>>` so that many concurrent
/// encrypt/decrypt calls can read it while [`PassphraseStore::rotate`] swaps it.
#[derive(Clone, Debug)]
pub struct PassphraseStore {
    inner: Arc<RwLock<Option<Passphrase>>>,
}

impl PassphraseStore {
    /// Create a new, empty [`PassphraseStore`].
    ///
    /// Every call must then supply its own passphrase.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a store already holding `passphrase`.
    ///
    /// # Errors
    ///
    /// Returns [`PassphraseError::Empty`] if `passphrase` is empty.
    pub fn with_passphrase(passphrase: &str) -> Result<Self, PassphraseError> {
        if passphrase.is_empty() {
            return Err(PassphraseError::Empty);
        }
        Ok(Self {
            inner: Arc::new(RwLock::new(Some(Passphrase::from(passphrase)))),
        })
    }

    /// Returns `true` if a default passphrase is set.
    pub async fn is_ready(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Store (or replace) the default passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`PassphraseError::Empty`] if `passphrase` is empty.
    pub async fn store(&self, passphrase: &str) -> Result<(), PassphraseError> {
        if passphrase.is_empty() {
            return Err(PassphraseError::Empty);
        }
        let mut lock = self.inner.write().await;
        *lock = Some(Passphrase::from(passphrase));
        Ok(())
    }

    /// Replace the default passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`PassphraseError::Empty`] if `passphrase` is empty; the previous
    /// value is kept.
    pub async fn rotate(&self, passphrase: &str) -> Result<(), PassphraseError> {
        let had_previous = self.is_ready().await;
        self.store(passphrase).await?;
        info!(had_previous, "default passphrase rotated");
        Ok(())
    }

    /// Borrow a clone of the default passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`PassphraseError::NotInitialised`] if none has been stored.
    pub async fn current(&self) -> Result<Passphrase, PassphraseError> {
        let current = self.inner.read().await.as_ref().cloned();
        current.ok_or(PassphraseError::NotInitialised)
    }
}

impl Default for PassphraseStore {
    fn default() -> Self {
        Self::new()
    }
}
