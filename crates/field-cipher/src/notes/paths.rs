//! Dot-notation field paths and their application to arbitrary JSON records.

use std::collections::BTreeSet;

use serde_json::Value;
use thiserror::Error;

use crate::crypto::{Decrypted, EncryptionError, FieldCipher};

/// Errors from parsing a field path list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// The list contained no paths.
    #[error("no note fields configured")]
    Empty,

    /// A path had an empty segment (`"a..b"`, `".a"`, `"[]"`).
    #[error("invalid field path: {0:?}")]
    EmptySegment(String),
}

/// Segments of a dot-notation field path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// Navigate into an object property by name.
    Key(String),
    /// Expand into every element of a JSON array.
    ArrayItem,
}

/// A set of field paths, e.g. `title,content` or `notes[].title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPaths {
    paths: Vec<Vec<PathSegment>>,
}

impl FieldPaths {
    /// Parse a comma-separated list of paths. Whitespace around entries is ignored.
    ///
    /// Array fields use the `[]` suffix before the dot separator, e.g.
    /// `"notes[].title"` → `[Key("notes"), ArrayItem, Key("title")]`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if the list is empty or a path has an empty segment.
    pub fn parse(list: &str) -> Result<Self, PathError> {
        let mut paths = Vec::new();
        for raw in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let mut segments = Vec::new();
            for part in raw.split('.') {
                let (key, array) = match part.strip_suffix("[]") {
                    Some(key) => (key, true),
                    None => (part, false),
                };
                if key.is_empty() {
                    return Err(PathError::EmptySegment(raw.to_owned()));
                }
                segments.push(PathSegment::Key(key.to_owned()));
                if array {
                    segments.push(PathSegment::ArrayItem);
                }
            }
            paths.push(segments);
        }
        if paths.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self { paths })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// JSON pointers of every string leaf in `value` matched by these paths.
    ///
    /// Deduplicated, so overlapping paths never seal a field twice.
    fn string_leaves(&self, value: &Value) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for segments in &self.paths {
            collect(value, segments, String::new(), &mut out);
        }
        out
    }
}

fn collect(value: &Value, segments: &[PathSegment], pointer: String, out: &mut BTreeSet<String>) {
    let Some((head, rest)) = segments.split_first() else {
        if value.is_string() {
            out.insert(pointer);
        }
        return;
    };
    match (head, value) {
        (PathSegment::Key(key), Value::Object(map)) => {
            if let Some(child) = map.get(key) {
                collect(child, rest, format!("{pointer}/{}", escape(key)), out);
            }
        }
        (PathSegment::ArrayItem, Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                collect(item, rest, format!("{pointer}/{i}"), out);
            }
        }
        _ => {}
    }
}

/// RFC 6901 escaping of a single reference token.
fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Per-record outcome of [`open_fields`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldReport {
    /// Fields decrypted back to plaintext.
    pub recovered: u64,
    /// Fields left as they were.
    pub passed_through: u64,
}

/// Encrypt every string field in `payload` matched by `paths`, in place.
///
/// Returns the number of non-empty fields sealed. Missing fields and non-string
/// values are left untouched.
///
/// # Errors
///
/// Returns the first [`EncryptionError`]. `payload` may then be partially
/// sealed and must be discarded.
pub async fn seal_fields(
    cipher: &FieldCipher,
    payload: &mut Value,
    paths: &FieldPaths,
) -> Result<u64, EncryptionError> {
    let mut sealed = 0;
    for pointer in paths.string_leaves(payload) {
        let Some(Value::String(text)) = payload.pointer_mut(&pointer) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        let plaintext = std::mem::take(text);
        let envelope = cipher.encrypt(&plaintext, None).await?;
        if let Some(slot) = payload.pointer_mut(&pointer) {
            *slot = Value::String(envelope);
        }
        sealed += 1;
    }
    Ok(sealed)
}

/// Decrypt every string field in `payload` matched by `paths`, in place.
///
/// Fields that are not readable envelopes keep their original value.
pub async fn open_fields(
    cipher: &FieldCipher,
    payload: &mut Value,
    paths: &FieldPaths,
) -> FieldReport {
    let mut report = FieldReport::default();
    for pointer in paths.string_leaves(payload) {
        let Some(Value::String(text)) = payload.pointer_mut(&pointer) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        let stored = std::mem::take(text);
        let opened = cipher.decrypt(&stored, None).await;
        match opened {
            Decrypted::Recovered(_) => report.recovered += 1,
            Decrypted::PassedThrough { .. } => report.passed_through += 1,
        }
        if let Some(slot) = payload.pointer_mut(&pointer) {
            *slot = Value::String(opened.into_text());
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{looks_encoded, KdfParams};
    use crate::passphrase::PassphraseStore;
    use serde_json::json;

    fn cipher() -> FieldCipher {
        FieldCipher::new(
            KdfParams::new("test-salt", 1_000),
            PassphraseStore::with_passphrase("pw").unwrap(),
        )
    }

    #[test]
    fn parse_flat_list() {
        let p = FieldPaths::parse("title, content").unwrap();
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn parse_nested_and_array() {
        let p = FieldPaths::parse("notes[].title").unwrap();
        assert_eq!(
            p.paths[0],
            vec![
                PathSegment::Key("notes".into()),
                PathSegment::ArrayItem,
                PathSegment::Key("title".into())
            ]
        );
    }

    #[test]
    fn parse_rejects_empty_list_and_segments() {
        assert_eq!(FieldPaths::parse(" , ").unwrap_err(), PathError::Empty);
        assert!(matches!(
            FieldPaths::parse("a..b"),
            Err(PathError::EmptySegment(_))
        ));
        assert!(matches!(
            FieldPaths::parse("[]"),
            Err(PathError::EmptySegment(_))
        ));
    }

    #[test]
    fn leaves_are_deduplicated_and_escaped() {
        let p = FieldPaths::parse("title,title,a/b").unwrap();
        let v = json!({"title": "t", "a/b": "x"});
        let leaves: Vec<_> = p.string_leaves(&v).into_iter().collect();
        assert_eq!(leaves, vec!["/a~1b".to_string(), "/title".to_string()]);
    }

    #[tokio::test]
    async fn seal_then_open_flat_note() {
        let c = cipher();
        let paths = FieldPaths::parse("title,content").unwrap();
        let mut v = json!({"title": "Groceries", "content": "eggs, milk", "owner_id": 1});
        assert_eq!(seal_fields(&c, &mut v, &paths).await.unwrap(), 2);
        assert!(looks_encoded(v["title"].as_str().unwrap()));
        assert_eq!(v["owner_id"], 1);

        let report = open_fields(&c, &mut v, &paths).await;
        assert_eq!(report.recovered, 2);
        assert_eq!(report.passed_through, 0);
        assert_eq!(v["title"], "Groceries");
        assert_eq!(v["content"], "eggs, milk");
    }

    #[tokio::test]
    async fn seal_array_field() {
        let c = cipher();
        let paths = FieldPaths::parse("notes[].title").unwrap();
        let mut v = json!({"notes": [{"title": "a"}, {"title": "b"}, {"title": 3}]});
        assert_eq!(seal_fields(&c, &mut v, &paths).await.unwrap(), 2);
        for note in &v["notes"].as_array().unwrap()[..2] {
            assert!(looks_encoded(note["title"].as_str().unwrap()));
        }
        assert_eq!(v["notes"][2]["title"], 3);
    }

    #[tokio::test]
    async fn missing_and_empty_fields_are_noops() {
        let c = cipher();
        let paths = FieldPaths::parse("title,content").unwrap();
        let mut v = json!({"title": ""});
        assert_eq!(seal_fields(&c, &mut v, &paths).await.unwrap(), 0);
        assert_eq!(v, json!({"title": ""}));
    }

    #[tokio::test]
    async fn open_mixed_legacy_and_sealed() {
        let c = cipher();
        let paths = FieldPaths::parse("title,content").unwrap();
        let sealed = c.encrypt("new body", None).await.unwrap();
        let mut v = json!({"title": "old plaintext title", "content": sealed});
        let report = open_fields(&c, &mut v, &paths).await;
        assert_eq!(report.recovered, 1);
        assert_eq!(report.passed_through, 1);
        assert_eq!(v["title"], "old plaintext title");
        assert_eq!(v["content"], "new body");
    }
}
