//! Configuration loading and validation for the `seccookie` CLI.
//!
//! All values are read from `SECCOOKIE_*` environment variables. Keys are
//! standard base64.

use std::fmt;

use anyhow::{Context, Result};
use seccookie::{Algorithm, Key, TagLength};
use serde::Deserialize;

/// Validated CLI configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Base64 key used to seal new envelopes. **Required.**
    pub encryption_key: String,

    /// Comma-separated base64 keys accepted when opening. When unset, only
    /// the encryption key is accepted.
    #[serde(default)]
    pub decryption_keys: Option<String>,

    /// Authentication tag length in bits.
    #[serde(default = "default_tag_length_bits")]
    pub tag_length_bits: u32,

    /// `aes-gcm` or `aes-gcm-siv`.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_tag_length_bits() -> u32 {
    TagLength::DEFAULT.bits()
}
fn default_algorithm() -> String {
    Algorithm::default().name().into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is absent or any value is
    /// invalid.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("SECCOOKIE"))
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
        if self.encryption_key.trim().is_empty() {
            anyhow::bail!("SECCOOKIE_ENCRYPTION_KEY is required and must not be empty");
        }
        self.encryption_key()?;
        self.decryption_keys()?;
        self.tag_length()?;
        self.algorithm()?;
        Ok(())
    }

    pub fn encryption_key(&self) -> Result<Key> {
        Key::from_base64(&self.encryption_key).context("SECCOOKIE_ENCRYPTION_KEY is invalid")
    }

    /// Decryption keys in configured order, or `None` if unset.
    pub fn decryption_keys(&self) -> Result<Option<Vec<Key>>> {
        let Some(list) = self.decryption_keys.as_deref() else {
            return Ok(None);
        };
        let keys = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .enumerate()
            .map(|(i, encoded)| {
                Key::from_base64(encoded)
                    .with_context(|| format!("SECCOOKIE_DECRYPTION_KEYS entry #{i} is invalid"))
            })
            .collect::<Result<Vec<_>>>()?;
        if keys.is_empty() {
            anyhow::bail!("SECCOOKIE_DECRYPTION_KEYS is set but contains no keys");
        }
        Ok(Some(keys))
    }

    pub fn tag_length(&self) -> Result<TagLength> {
        TagLength::from_bits(self.tag_length_bits).context("SECCOOKIE_TAG_LENGTH_BITS is invalid")
    }

    pub fn algorithm(&self) -> Result<Algorithm> {
        self.algorithm
            .parse()
            .context("SECCOOKIE_ALGORITHM is invalid")
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("encryption_key", &"[REDACTED]")
            .field(
                "decryption_keys",
                &self.decryption_keys.as_ref().map(|_| "[REDACTED]"),
            )
            .field("tag_length_bits", &self.tag_length_bits)
            .field("algorithm", &self.algorithm)
            .field("log_level", &self.log_level)
            .finish()
    }
}
