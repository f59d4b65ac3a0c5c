//! Configuration loading and validation for the `notes-cipher` filter.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use common::protocol::Mode;
use serde::Deserialize;

use crate::crypto::{FieldCipher, KdfParams, KeyCache, DEFAULT_ITERATIONS, DEFAULT_SALT};
use crate::notes::FieldPaths;
use crate::passphrase::PassphraseStore;

/// Validated filter configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Default passphrase every note key is derived from. **Required.**
    pub secret_key: String,

    /// Static PBKDF2 salt. Must match the value existing notes were written with.
    #[serde(default = "default_kdf_salt")]
    pub kdf_salt: String,

    /// PBKDF2 round count. Must match the value existing notes were written with.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Keep derived keys in memory instead of re-deriving on every field.
    #[serde(default)]
    pub key_cache: bool,

    /// Maximum number of cached keys.
    #[serde(default = "default_key_cache_capacity")]
    pub key_cache_capacity: usize,

    /// `"seal"` to encrypt records, `"open"` to decrypt them.
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Comma-separated dot-notation paths of the fields to process.
    #[serde(default = "default_note_fields")]
    pub note_fields: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`), used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_kdf_salt() -> String {
    DEFAULT_SALT.into()
}
fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}
fn default_key_cache_capacity() -> usize {
    16
}
fn default_mode() -> String {
    "seal".into()
}
fn default_note_fields() -> String {
    "title,content".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.secret_key, "SECRET_KEY")?;
        ensure_non_empty(&self.kdf_salt, "KDF_SALT")?;

        if self.kdf_iterations == 0 {
            anyhow::bail!("KDF_ITERATIONS must be > 0");
        }
        if self.key_cache && self.key_cache_capacity == 0 {
            anyhow::bail!("KEY_CACHE_CAPACITY must be > 0 when KEY_CACHE is enabled");
        }
        self.mode()?;
        self.field_paths()?;
        Ok(())
    }

    /// The run direction.
    ///
    /// # Errors
    ///
    /// Returns an error if `MODE` is neither `seal` nor `open`.
    pub fn mode(&self) -> Result<Mode> {
        match self.mode.trim().to_ascii_lowercase().as_str() {
            "seal" => Ok(Mode::Seal),
            "open" => Ok(Mode::Open),
            other => anyhow::bail!("MODE must be \"seal\" or \"open\", got {other:?}"),
        }
    }

    /// The parsed `NOTE_FIELDS` list.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or malformed.
    pub fn field_paths(&self) -> Result<FieldPaths> {
        FieldPaths::parse(&self.note_fields).context("NOTE_FIELDS is invalid")
    }

    pub fn kdf_params(&self) -> KdfParams {
        KdfParams::new(self.kdf_salt.as_bytes(), self.kdf_iterations)
    }

    /// Build the [`FieldCipher`] described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret key is empty.
    pub fn build_cipher(&self) -> Result<FieldCipher> {
        let store = PassphraseStore::with_passphrase(&self.secret_key)
            .context("SECRET_KEY is not a usable passphrase")?;
        let cipher = FieldCipher::new(self.kdf_params(), store);
        Ok(if self.key_cache {
            cipher.with_key_cache(KeyCache::new(self.key_cache_capacity))
        } else {
            cipher
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("secret_key", &"[REDACTED]")
            .field("kdf_salt", &self.kdf_salt)
            .field("kdf_iterations", &self.kdf_iterations)
            .field("key_cache", &self.key_cache)
            .field("key_cache_capacity", &self.key_cache_capacity)
            .field("mode", &self.mode)
            .field("note_fields", &self.note_fields)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            secret_key: "correct-horse".into(),
            kdf_salt: default_kdf_salt(),
            kdf_iterations: default_kdf_iterations(),
            key_cache: false,
            key_cache_capacity: default_key_cache_capacity(),
            mode: default_mode(),
            note_fields: default_note_fields(),
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_kdf_salt(), "note-app-salt-2024");
        assert_eq!(default_kdf_iterations(), 100_000);
        assert_eq!(default_key_cache_capacity(), 16);
        assert_eq!(default_mode(), "seal");
        assert_eq!(default_note_fields(), "title,content");
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_secret_key() {
        let cfg = Config {
            secret_key: "  ".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_iterations() {
        let cfg = Config {
            kdf_iterations: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_capacity_only_when_cache_enabled() {
        let off = Config {
            key_cache_capacity: 0,
            ..valid()
        };
        assert!(off.validate().is_ok());
        let on = Config {
            key_cache: true,
            ..off
        };
        assert!(on.validate().is_err());
    }

    #[test]
    fn mode_parsing() {
        let open = Config {
            mode: "OPEN".into(),
            ..valid()
        };
        assert_eq!(open.mode().unwrap(), Mode::Open);
        let bad = Config {
            mode: "shred".into(),
            ..valid()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_note_fields() {
        let cfg = Config {
            note_fields: "title..x".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let dbg = format!("{:?}", valid());
        assert!(!dbg.contains("correct-horse"));
        assert!(dbg.contains("REDACTED"));
    }

    #[test]
    fn build_cipher_uses_configured_params() {
        let cfg = Config {
            kdf_salt: "other".into(),
            kdf_iterations: 5,
            ..valid()
        };
        let cipher = cfg.build_cipher().unwrap();
        assert_eq!(cipher.params(), &KdfParams::new("other", 5));
    }
}
