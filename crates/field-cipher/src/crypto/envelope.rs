//! Text encoding of `nonce ‖ ciphertext+tag` and the legacy-plaintext probe.
//!
//! The envelope carries no version tag. Records written before encryption was
//! introduced hold raw plaintext in the same fields, so [`Envelope::classify`]
//! has to guess which one it is looking at.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the AES-GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Why a field was returned as-is instead of being decrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassThrough {
    /// The field was empty.
    Empty,
    /// The field is not canonical padded base64, so it was never an envelope.
    NotEncoded,
    /// The field decodes to fewer bytes than a nonce.
    TooShort,
    /// The field looked like an envelope but did not authenticate.
    Undecryptable,
}

impl PassThrough {
    /// Stable label for logs and counters.
    pub fn as_str(&self) -> &'static str {
        match self {
            PassThrough::Empty => "empty",
            PassThrough::NotEncoded => "not_encoded",
            PassThrough::TooShort => "too_short",
            PassThrough::Undecryptable => "undecryptable",
        }
    }
}

/// A decoded envelope.
///
/// The string representation is `base64(nonce ‖ ciphertext+tag)` with the
/// standard alphabet and `=` padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Raw nonce bytes.
    pub nonce: [u8; NONCE_LEN],
    /// Raw ciphertext + authentication tag bytes.
    pub sealed: Vec<u8>,
}

impl Envelope {
    /// Encode this envelope to its storage string.
    pub fn encode(&self) -> String {
        let mut combined = Vec::with_capacity(NONCE_LEN + self.sealed.len());
        combined.extend_from_slice(&self.nonce);
        combined.extend_from_slice(&self.sealed);
        STANDARD.encode(combined)
    }

    /// Split decoded bytes into nonce and ciphertext. `None` if shorter than a nonce.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < NONCE_LEN {
            return None;
        }
        let (nonce_bytes, sealed) = bytes.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);
        Some(Self {
            nonce,
            sealed: sealed.to_vec(),
        })
    }

    /// Decide whether `input` is an envelope worth attempting to decrypt.
    ///
    /// # Errors
    ///
    /// Returns the [`PassThrough`] reason when `input` is empty, fails the
    /// base64 probe, or is too short to hold a nonce. The tag length is not
    /// checked here; a truncated envelope fails authentication instead.
    pub fn classify(input: &str) -> Result<Self, PassThrough> {
        if input.is_empty() {
            return Err(PassThrough::Empty);
        }
        let decoded = probe(input).ok_or(PassThrough::NotEncoded)?;
        Self::from_bytes(&decoded).ok_or(PassThrough::TooShort)
    }
}

/// `true` if `input` is canonical padded base64.
///
/// Length must be a multiple of 4, and decoding then re-encoding must give back
/// exactly `input`. This is a heuristic: short plaintext such as `"test"` passes.
pub fn looks_encoded(input: &str) -> bool {
    probe(input).is_some()
}

fn probe(input: &str) -> Option<Vec<u8>> {
    if input.is_empty() || input.len() % 4 != 0 {
        return None;
    }
    let decoded = STANDARD.decode(input).ok()?;
    (STANDARD.encode(&decoded) == input).then_some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_prefixes_nonce() {
        let env = Envelope {
            nonce: [0u8; NONCE_LEN],
            sealed: vec![0xFF; TAG_LEN],
        };
        let s = env.encode();
        assert_eq!(s.len(), 40);
        assert!(s.starts_with("AAAAAAAAAAAAAAAA"));
        assert_eq!(Envelope::classify(&s).unwrap(), env);
    }

    #[test]
    fn plain_sentence_is_not_encoded() {
        assert!(!looks_encoded("hello world"));
        assert_eq!(
            Envelope::classify("hello world").unwrap_err(),
            PassThrough::NotEncoded
        );
    }

    #[test]
    fn empty_is_its_own_reason() {
        assert!(!looks_encoded(""));
        assert_eq!(Envelope::classify("").unwrap_err(), PassThrough::Empty);
    }

    #[test]
    fn length_must_be_multiple_of_four() {
        assert!(!looks_encoded("QUJD="));
        assert!(looks_encoded("QUJD"));
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        assert!(!looks_encoded("ab-_"));
        assert!(!looks_encoded("ab c"));
    }

    #[test]
    fn rejects_non_canonical_trailing_bits() {
        // "QQ==" is canonical for b"A"; "QR==" decodes leniently to the same byte.
        assert!(looks_encoded("QQ=="));
        assert!(!looks_encoded("QR=="));
    }

    #[test]
    fn short_word_probes_as_base64_but_is_too_short() {
        assert!(looks_encoded("test"));
        assert_eq!(
            Envelope::classify("test").unwrap_err(),
            PassThrough::TooShort
        );
    }

    #[test]
    fn exactly_nonce_length_is_accepted_structurally() {
        let s = STANDARD.encode([7u8; NONCE_LEN]);
        let env = Envelope::classify(&s).unwrap();
        assert_eq!(env.nonce, [7u8; NONCE_LEN]);
        assert!(env.sealed.is_empty());
    }

    #[test]
    fn from_bytes_rejects_short_input() {
        assert!(Envelope::from_bytes(&[0u8; NONCE_LEN - 1]).is_none());
    }

    #[test]
    fn reason_labels() {
        assert_eq!(PassThrough::NotEncoded.as_str(), "not_encoded");
        assert_eq!(PassThrough::Undecryptable.as_str(), "undecryptable");
    }
}
