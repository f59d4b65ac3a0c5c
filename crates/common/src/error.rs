//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to process exit codes (BSD `sysexits.h`):
/// - [`ServiceError::InvalidRecord`] → 65 (`EX_DATAERR`)
/// - [`ServiceError::EncryptionFailure`] → 70 (`EX_SOFTWARE`)
/// - [`ServiceError::Unavailable`] → 69 (`EX_UNAVAILABLE`)
/// - [`ServiceError::Internal`] → 70 (`EX_SOFTWARE`)
#[derive(Debug, Error)]
pub enum ServiceError {
    /// An input record was malformed (not JSON).
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// A field could not be encrypted. The record must not be stored.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// No passphrase is available to seal with: no default is configured.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred (I/O, task failure).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the process exit code that should be used for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServiceError::InvalidRecord(_) => 65,
            ServiceError::EncryptionFailure(_) => 70,
            ServiceError::Unavailable(_) => 69,
            ServiceError::Internal(_) => 70,
        }
    }

    /// Short machine-readable code used in [`crate::protocol::ErrorLine`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidRecord(_) => "invalid_record",
            ServiceError::EncryptionFailure(_) => "encryption_failure",
            ServiceError::Unavailable(_) => "unavailable",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}
