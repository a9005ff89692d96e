//! Key material and the sources that supply it to the codec.
//!
//! # Security invariants
//!
//! - Key bytes are zeroed on drop and never appear in `Debug` output.
//! - Logs may identify a key only through [`Key::fingerprint`].
//! - The codec asks its [`KeySource`] for keys on every call and never keeps
//!   them afterwards, so rotation takes effect immediately.

pub mod ring;

pub use ring::{KeyRing, KeyRingError};

use std::fmt;

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors produced when building a [`Key`].
#[derive(Debug, Error)]
pub enum KeyError {
    /// Key material must contain at least one byte.
    #[error("key material is empty")]
    Empty,

    /// The encoded key is not valid base64.
    #[error("key is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Symmetric secret key. The algorithm decides which lengths are usable.
#[derive(Clone)]
pub struct Key(Box<[u8]>);

impl Key {
    /// Copy `bytes` into a new key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Empty`] for an empty slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self(bytes.into()))
    }

    /// Decode a standard base64 key, as stored in configuration.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let mut decoded = STANDARD.decode(encoded.trim())?;
        let key = Self::from_slice(&decoded);
        decoded.iter_mut().for_each(|b| *b = 0);
        key
    }

    /// Generate `len` random bytes from the OS CSPRNG.
    pub fn generate(len: usize) -> Self {
        let mut bytes = vec![0u8; len].into_boxed_slice();
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Standard base64 of the key bytes, the inverse of [`Key::from_base64`].
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Short, non-reversible identifier safe to log: base64url of the first
    /// 8 bytes of SHA-256 over the key.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.0);
        URL_SAFE_NO_PAD.encode(&digest[..8])
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key([REDACTED])")
    }
}

/// Constant-time for keys of equal length.
impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

impl Eq for Key {}

/// Ordered keys tried, in order, when opening an envelope.
pub type KeySet = Vec<Key>;

/// Supplies the current encryption key and decryption key set.
///
/// Both are queried on every codec call. Implementations must be safe for
/// concurrent use.
pub trait KeySource: Send + Sync {
    /// Key used to seal new envelopes.
    fn encryption_key(&self) -> Key;

    /// Keys accepted when opening envelopes. Defaults to the current
    /// encryption key alone.
    fn decryption_keys(&self) -> KeySet {
        vec![self.encryption_key()]
    }
}

/// Any `Fn() -> Key` closure is an encryption key supplier.
impl<F> KeySource for F
where
    F: Fn() -> Key + Send + Sync,
{
    fn encryption_key(&self) -> Key {
        self()
    }
}

/// A single key that never rotates.
#[derive(Debug, Clone)]
pub struct StaticKey(Key);

impl StaticKey {
    pub fn new(key: Key) -> Self {
        Self(key)
    }
}

impl KeySource for StaticKey {
    fn encryption_key(&self) -> Key {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_redacted_in_debug() {
        let key = Key::from_slice(&[0xFF; 16]).unwrap();
        let shown = format!("{key:?}");
        assert!(shown.contains("REDACTED"));
        assert!(!shown.contains("255"));
    }

    #[test]
    fn empty_key_rejected() {
        assert!(matches!(Key::from_slice(&[]), Err(KeyError::Empty)));
        assert!(matches!(Key::from_base64(""), Err(KeyError::Empty)));
    }

    #[test]
    fn base64_round_trip() {
        let key = Key::generate(32);
        let decoded = Key::from_base64(&key.to_base64()).unwrap();
        assert_eq!(decoded, key);
        assert!(matches!(
            Key::from_base64("not base64!"),
            Err(KeyError::InvalidBase64(_))
        ));
    }

    #[test]
    fn equality_compares_bytes() {
        let a = Key::from_slice(&[1, 2, 3]).unwrap();
        let b = Key::from_slice(&[1, 2, 3]).unwrap();
        let c = Key::from_slice(&[1, 2, 4]).unwrap();
        let d = Key::from_slice(&[1, 2]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn fingerprint_is_stable_and_short() {
        let key = Key::from_slice(&[0x42; 16]).unwrap();
        assert_eq!(key.fingerprint(), key.clone().fingerprint());
        assert_eq!(key.fingerprint().len(), 11);
        assert_ne!(key.fingerprint(), Key::generate(16).fingerprint());
    }

    #[test]
    fn closure_defaults_to_singleton_decryption_set() {
        let key = Key::generate(16);
        let expected = key.clone();
        let source = move || key.clone();
        assert_eq!(source.decryption_keys(), vec![expected]);
    }

    #[test]
    fn static_key_source() {
        let key = Key::generate(16);
        let source = StaticKey::new(key.clone());
        assert_eq!(source.encryption_key(), key);
        assert_eq!(source.decryption_keys().len(), 1);
    }
}
