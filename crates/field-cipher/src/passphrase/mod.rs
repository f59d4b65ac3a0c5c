//! The process-wide default passphrase.
//!
//! # Lifecycle
//!
//! 1. At startup the passphrase is read from configuration and placed in a
//!    [`PassphraseStore`], which is handed to the [`crate::FieldCipher`].
//! 2. Calls that do not supply their own passphrase borrow a short-lived clone
//!    via [`PassphraseStore::current`].
//! 3. [`PassphraseStore::rotate`] swaps in a new value at runtime. Envelopes
//!    written under the old value stop decrypting (they pass through unchanged).
//!
//! # Security invariants
//!
//! - The passphrase is **never** logged or included in traces.
//! - Every copy is zeroed when dropped.

pub mod store;

pub use store::{Passphrase, PassphraseError, PassphraseStore};
