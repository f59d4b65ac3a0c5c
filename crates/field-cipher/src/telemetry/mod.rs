//! Structured logging for the `notes-cipher` filter.
//!
//! stdout carries records, so logs go to stderr as JSON lines.
//!
//! # Telemetry invariants
//!
//! - **No note contents, passphrases or key material** in any span attribute or
//!   log field. Field lengths and pass-through reasons are allowed.
//! - Log level is configurable via `RUST_LOG`, falling back to `LOG_LEVEL` (default: `info`).

pub mod init;

pub use init::init;
