//! Records exchanged with the notes backend and emitted by the `notes-cipher` filter.
//!
//! Note titles and bodies travel as opaque strings: plaintext on the client side,
//! base64 envelopes once sealed. These types do not know which one they hold.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Note records
// ---------------------------------------------------------------------------

/// Body of a create/update request sent to the notes backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCreate {
    /// Note title, sealed before it leaves the client.
    pub title: String,
    /// Note body, sealed before it leaves the client.
    pub content: String,
    /// Id of the owning user.
    pub owner_id: i64,
}

/// A note as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    /// Stored title; may be an envelope or legacy plaintext.
    #[serde(default)]
    pub title: String,
    /// Stored body; may be an envelope or legacy plaintext.
    #[serde(default)]
    pub content: String,
    pub owner_id: i64,
}

// ---------------------------------------------------------------------------
// Filter output
// ---------------------------------------------------------------------------

/// Written to stdout in place of a record that could not be processed, so
/// output lines stay aligned with input lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLine {
    /// Short machine-readable error code (e.g. `"invalid_record"`).
    pub code: String,
    /// Human-readable description. Never contains field contents.
    pub message: String,
    /// 1-based input line number.
    pub line: u64,
}

impl ErrorLine {
    /// Construct an [`ErrorLine`] from a code, message and line number.
    pub fn new(code: impl Into<String>, message: impl Into<String>, line: u64) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            line,
        }
    }
}

/// Direction of a filter run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Encrypt configured fields before storage.
    Seal,
    /// Decrypt configured fields after retrieval.
    Open,
}

/// Counters reported once a filter run completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records successfully written.
    pub records: u64,
    /// Fields replaced by a fresh envelope.
    pub fields_sealed: u64,
    /// Fields decrypted back to plaintext.
    pub fields_recovered: u64,
    /// Fields left as they were (legacy plaintext or undecryptable).
    pub fields_passed_through: u64,
    /// Input lines that were not valid JSON.
    pub invalid_lines: u64,
}
