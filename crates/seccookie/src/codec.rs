//! [`SecCookieCodec`]: value ⇄ authenticated envelope.
//!
//! Write path: serialize → fresh nonce → current encryption key → AEAD seal →
//! `nonce || ciphertext || tag`.
//!
//! Read path: length check → split → decryption key set → AEAD open →
//! deserialize.
//!
//! # Multi-key opening
//!
//! With more than one decryption key, every key is tried, in order, even after
//! one succeeds, so the time taken does not depend on which key matched. If
//! several keys succeed the **last** success wins.

use tracing::{debug, warn};

use crate::crypto::{nonce::fresh_nonce, CipherError};
use crate::envelope::{self, Envelope};
use crate::error::{EnvelopeError, OpenFailure};
use crate::keys::Key;
use crate::settings::Settings;

/// Seals values into envelopes and opens them again.
///
/// Stateless between calls; share it freely across threads.
pub struct SecCookieCodec<T> {
    settings: Settings<T>,
}

impl<T> SecCookieCodec<T> {
    /// Build a codec.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::UnsupportedTagLength`] if the engine factory
    /// cannot produce tags of the configured length.
    pub fn new(settings: Settings<T>) -> Result<Self, CipherError> {
        if !settings.engine.supports(settings.tag_length) {
            return Err(CipherError::UnsupportedTagLength {
                bits: settings.tag_length.bits(),
            });
        }
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &Settings<T> {
        &self.settings
    }

    /// Length of the shortest envelope [`open`](Self::open) will consider.
    pub fn min_envelope_len(&self) -> usize {
        Envelope::min_len(self.settings.tag_length)
    }

    /// Seal `value` into envelope bytes.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::Serialization`] if the serializer fails, or
    /// [`EnvelopeError::Seal`] if the current key cannot be used.
    pub fn seal(&self, value: &T) -> Result<Vec<u8>, EnvelopeError> {
        let plaintext = (self.settings.serializer)(value).map_err(EnvelopeError::Serialization)?;
        let nonce = fresh_nonce(self.settings.nonce_source.as_ref());
        let key = self.settings.keys.encryption_key();

        let sealed = self
            .settings
            .engine
            .instantiate(&key, self.settings.tag_length)
            .and_then(|engine| engine.seal(&nonce, &plaintext))
            .map_err(EnvelopeError::Seal)?;

        Ok(envelope::pack(&nonce, &sealed))
    }

    /// Open envelope bytes produced by [`seal`](Self::seal).
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::Malformed`] if the input is too short; no key is
    ///   requested and no engine is built.
    /// - [`EnvelopeError::NoDecryptionKeys`] if the key set is empty.
    /// - [`EnvelopeError::AuthenticationFailure`] if no key authenticates it.
    /// - [`EnvelopeError::Serialization`] if the deserializer fails.
    pub fn open(&self, envelope: &[u8]) -> Result<T, EnvelopeError> {
        let envelope = Envelope::parse(envelope, self.settings.tag_length).map_err(|e| {
            debug!(error = %e, "rejecting envelope");
            e
        })?;

        let keys = self.settings.decryption_keys();
        let plaintext = self.decrypt(&envelope, &keys)?;

        (self.settings.deserializer)(plaintext.as_slice()).map_err(EnvelopeError::Serialization)
    }

    /// [`seal`](Self::seal), then encode as unpadded base64url.
    pub fn seal_to_string(&self, value: &T) -> Result<String, EnvelopeError> {
        self.seal(value).map(|bytes| envelope::to_text(&bytes))
    }

    /// Decode unpadded base64url, then [`open`](Self::open).
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::InvalidEncoding`] for text that is not base64url, and
    /// everything [`open`](Self::open) returns.
    pub fn open_str(&self, text: &str) -> Result<T, EnvelopeError> {
        let bytes = envelope::from_text(text)?;
        self.open(&bytes)
    }

    fn decrypt(&self, envelope: &Envelope<'_>, keys: &[Key]) -> Result<Vec<u8>, EnvelopeError> {
        match keys {
            [] => {
                warn!("decryption key set is empty");
                Err(EnvelopeError::NoDecryptionKeys)
            }
            [key] => self.attempt(key, envelope).map_err(|cause| {
                debug!(error = %cause, "envelope failed authentication");
                EnvelopeError::AuthenticationFailure {
                    failures: vec![OpenFailure {
                        key_index: 0,
                        cause,
                    }],
                }
            }),
            _ => {
                let mut accepted = None;
                let mut successes = 0usize;
                let mut failures = Vec::with_capacity(keys.len());

                for (key_index, key) in keys.iter().enumerate() {
                    match self.attempt(key, envelope) {
                        Ok(plaintext) => {
                            successes += 1;
                            accepted = Some(plaintext);
                        }
                        Err(cause) => failures.push(OpenFailure { key_index, cause }),
                    }
                }

                if successes > 1 {
                    debug!(successes, "several decryption keys accepted the envelope; keeping the last");
                }
                accepted.ok_or_else(|| {
                    debug!(attempts = keys.len(), "envelope failed authentication");
                    EnvelopeError::AuthenticationFailure { failures }
                })
            }
        }
    }

    fn attempt(&self, key: &Key, envelope: &Envelope<'_>) -> Result<Vec<u8>, CipherError> {
        self.settings
            .engine
            .instantiate(key, self.settings.tag_length)?
            .open(envelope.nonce(), envelope.sealed())
    }
}

impl<T> Clone for SecCookieCodec<T> {
    fn clone(&self) -> Self {
        Self {
            settings: self.settings.clone(),
        }
    }
}

impl<T> std::fmt::Debug for SecCookieCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecCookieCodec")
            .field("settings", &self.settings)
            .finish()
    }
}
