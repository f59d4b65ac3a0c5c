//! Sealing note records before they are sent to the backend, and opening them
//! after they are read back.
//!
//! Typed helpers work on [`common::protocol`] records and process title and
//! body concurrently. [`paths`] applies the same operations to arbitrary JSON
//! records through configurable field paths.

pub mod paths;

pub use paths::{open_fields, seal_fields, FieldPaths, FieldReport, PathError};

use common::protocol::{Note, NoteCreate};

use crate::crypto::{Decrypted, EncryptionError, FieldCipher};

/// Encrypt the title and content of a note about to be saved.
///
/// # Errors
///
/// Returns the first [`EncryptionError`]; the note must not be sent.
pub async fn seal_note(
    cipher: &FieldCipher,
    note: NoteCreate,
) -> Result<NoteCreate, EncryptionError> {
    let (title, content) = tokio::try_join!(
        cipher.encrypt(&note.title, None),
        cipher.encrypt(&note.content, None)
    )?;
    Ok(NoteCreate {
        title,
        content,
        owner_id: note.owner_id,
    })
}

/// A note read back from storage with per-field outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedNote {
    pub id: i64,
    pub owner_id: i64,
    pub title: Decrypted,
    pub content: Decrypted,
}

impl OpenedNote {
    /// `true` if neither field was left in its stored form.
    pub fn fully_recovered(&self) -> bool {
        let ok = |d: &Decrypted| d.is_recovered() || d.text().is_empty();
        ok(&self.title) && ok(&self.content)
    }

    /// Collapse to a plain [`Note`] for display.
    pub fn into_note(self) -> Note {
        Note {
            id: self.id,
            title: self.title.into_text(),
            content: self.content.into_text(),
            owner_id: self.owner_id,
        }
    }
}

/// Decrypt the title and content of a stored note.
///
/// Never fails; legacy plaintext fields are returned as they were.
pub async fn open_note(cipher: &FieldCipher, note: Note) -> OpenedNote {
    let (title, content) = tokio::join!(
        cipher.decrypt(&note.title, None),
        cipher.decrypt(&note.content, None)
    );
    OpenedNote {
        id: note.id,
        owner_id: note.owner_id,
        title,
        content,
    }
}
