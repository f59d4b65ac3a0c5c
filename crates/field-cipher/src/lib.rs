//! Client-side encryption of note titles and bodies.
//!
//! A key is derived from a passphrase with PBKDF2-HMAC-SHA256 over a static
//! salt, and each field is sealed with AES-256-GCM under a fresh nonce into a
//! base64 envelope. Opening tolerates fields that were stored before encryption
//! was introduced: anything that is not a readable envelope comes back as-is,
//! tagged with the reason.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use field_cipher::{FieldCipher, KdfParams, PassphraseStore};
//!
//! let cipher = FieldCipher::new(KdfParams::default(), PassphraseStore::with_passphrase("s3cret")?);
//! let stored = cipher.encrypt("Meeting notes", None).await?;
//! assert_eq!(cipher.decrypt_text(&stored, None).await, "Meeting notes");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod notes;
pub mod passphrase;
pub mod pipeline;
pub mod telemetry;

pub use crypto::{
    Decrypted, EncryptionError, FieldCipher, KdfParams, KeyDerivationError, PassThrough,
};
pub use passphrase::PassphraseStore;
