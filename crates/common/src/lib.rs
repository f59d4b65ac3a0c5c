//! Note records, line protocol, and errors shared across the secure-notes crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
