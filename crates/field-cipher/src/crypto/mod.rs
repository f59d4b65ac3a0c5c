//! Passphrase-derived AES-256-GCM encryption of note fields.
//!
//! This module has no I/O beyond the OS random source.
//!
//! # Ciphertext format
//!
//! ```text
//! base64(nonce[12] ‖ ciphertext ‖ tag[16])      standard alphabet, '=' padded
//! ```
//!
//! The format has no version prefix: envelopes share their fields with legacy
//! plaintext, and [`Envelope::classify`] tells them apart heuristically.

pub mod cipher;
pub mod envelope;
pub mod kdf;
pub mod key_cache;

pub use cipher::{Decrypted, EncryptionError, FieldCipher, NonceSource, OsNonceSource};
pub use envelope::{looks_encoded, Envelope, PassThrough, NONCE_LEN};
pub use kdf::{
    derive_key, DerivedKey, KdfParams, KeyDerivationError, DEFAULT_ITERATIONS, DEFAULT_SALT,
    KEY_LEN,
};
pub use key_cache::KeyCache;
