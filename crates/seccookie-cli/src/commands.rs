//! The work behind each subcommand, kept free of stdin/stdout handling.

use anyhow::{Context, Result};
use seccookie::{EnvelopeError, Key, SecCookieCodec, Settings, StaticKey};
use tracing::{debug, warn};

use crate::config::Config;

/// Key sizes accepted by `keygen`, in bytes.
pub const KEY_SIZES: [usize; 3] = [16, 24, 32];

/// Build a byte-buffer codec from validated configuration.
pub fn build_codec(cfg: &Config) -> Result<SecCookieCodec<Vec<u8>>> {
    let algorithm = cfg.algorithm()?;
    let tag_length = cfg.tag_length()?;

    let mut settings = Settings::raw(StaticKey::new(cfg.encryption_key()?))
        .with_algorithm(algorithm)
        .with_tag_length(tag_length);
    if let Some(keys) = cfg.decryption_keys()? {
        debug!(count = keys.len(), "using configured decryption keys");
        settings = settings.with_decryption_keys(move || keys.clone());
    }

    SecCookieCodec::new(settings).with_context(|| {
        format!("{algorithm} cannot be used with {}-bit tags", tag_length.bits())
    })
}

/// Seal `input` and return the URL-safe text form.
pub fn seal(codec: &SecCookieCodec<Vec<u8>>, input: &[u8]) -> Result<String> {
    codec
        .seal_to_string(&input.to_vec())
        .context("failed to seal input")
}

/// Open a text envelope. Surrounding whitespace is ignored.
pub fn open(codec: &SecCookieCodec<Vec<u8>>, input: &str) -> Result<Vec<u8>> {
    codec.open_str(input.trim()).map_err(|e| {
        if e.is_rejection() {
            warn!(error = %e, "envelope rejected");
        }
        anyhow::Error::new(e).context("failed to open envelope")
    })
}

/// Generate a random key of `bytes` length, standard base64.
pub fn keygen(bytes: usize) -> String {
    Key::generate(bytes).to_base64()
}

/// clap value parser for `keygen --bytes`.
pub fn parse_key_size(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{e}"))?;
    if KEY_SIZES.contains(&n) {
        Ok(n)
    } else {
        Err(format!("key size must be one of {KEY_SIZES:?}, got {n}"))
    }
}

/// Whether `err` came from a rejected envelope rather than a setup problem.
pub fn is_rejection(err: &anyhow::Error) -> bool {
    err.downcast_ref::<EnvelopeError>()
        .is_some_and(EnvelopeError::is_rejection)
}
