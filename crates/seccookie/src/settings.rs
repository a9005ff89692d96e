//! Immutable configuration for a [`SecCookieCodec`](crate::SecCookieCodec).

use std::{fmt, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};

use crate::crypto::{AeadFactory, Algorithm, CipherSuite, NonceSource, OsNonceSource, TagLength};
use crate::error::BoxError;
use crate::keys::{KeySet, KeySource};

/// Converts a value into plaintext bytes.
pub type Serializer<T> = Arc<dyn Fn(&T) -> Result<Vec<u8>, BoxError> + Send + Sync>;

/// Converts plaintext bytes back into a value.
pub type Deserializer<T> = Arc<dyn Fn(&[u8]) -> Result<T, BoxError> + Send + Sync>;

type DecryptionKeysSupplier = Arc<dyn Fn() -> KeySet + Send + Sync>;

/// Everything a codec needs, fixed once the codec is built.
///
/// Defaults: decryption keys are the current encryption key alone, 96-bit
/// tags, AES-GCM, nonces from the OS CSPRNG.
pub struct Settings<T> {
    pub(crate) serializer: Serializer<T>,
    pub(crate) deserializer: Deserializer<T>,
    pub(crate) keys: Arc<dyn KeySource>,
    pub(crate) decryption_keys: Option<DecryptionKeysSupplier>,
    pub(crate) tag_length: TagLength,
    pub(crate) engine: Arc<dyn AeadFactory>,
    pub(crate) nonce_source: Arc<dyn NonceSource>,
}

impl<T> Settings<T> {
    /// Build settings from a serializer pair and a key source.
    ///
    /// `keys` may be a [`KeyRing`](crate::KeyRing), a
    /// [`StaticKey`](crate::keys::StaticKey) or any `Fn() -> Key` closure.
    pub fn new<S, D, K>(serializer: S, deserializer: D, keys: K) -> Self
    where
        S: Fn(&T) -> Result<Vec<u8>, BoxError> + Send + Sync + 'static,
        D: Fn(&[u8]) -> Result<T, BoxError> + Send + Sync + 'static,
        K: KeySource + 'static,
    {
        Self {
            serializer: Arc::new(serializer),
            deserializer: Arc::new(deserializer),
            keys: Arc::new(keys),
            decryption_keys: None,
            tag_length: TagLength::default(),
            engine: Arc::new(CipherSuite::default()),
            nonce_source: Arc::new(OsNonceSource),
        }
    }

    /// Replace the decryption key set reported by the key source.
    ///
    /// The supplier is called on every [`open`](crate::SecCookieCodec::open).
    pub fn with_decryption_keys<F>(mut self, supplier: F) -> Self
    where
        F: Fn() -> KeySet + Send + Sync + 'static,
    {
        self.decryption_keys = Some(Arc::new(supplier));
        self
    }

    pub fn with_tag_length(mut self, tag_length: TagLength) -> Self {
        self.tag_length = tag_length;
        self
    }

    /// Use the built-in implementation of `algorithm`.
    pub fn with_algorithm(self, algorithm: Algorithm) -> Self {
        self.with_engine(Arc::new(CipherSuite::resolve(algorithm)))
    }

    /// Use a custom engine factory.
    pub fn with_engine(mut self, engine: Arc<dyn AeadFactory>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_nonce_source<N>(mut self, source: N) -> Self
    where
        N: NonceSource + 'static,
    {
        self.nonce_source = Arc::new(source);
        self
    }

    pub fn tag_length(&self) -> TagLength {
        self.tag_length
    }

    pub(crate) fn decryption_keys(&self) -> KeySet {
        match &self.decryption_keys {
            Some(supplier) => supplier(),
            None => self.keys.decryption_keys(),
        }
    }
}

impl<T> Settings<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// Settings that store values as JSON.
    pub fn json<K>(keys: K) -> Self
    where
        K: KeySource + 'static,
    {
        Self::new(
            |value: &T| serde_json::to_vec(value).map_err(BoxError::from),
            |bytes: &[u8]| serde_json::from_slice(bytes).map_err(BoxError::from),
            keys,
        )
    }
}

impl Settings<Vec<u8>> {
    /// Settings that seal byte buffers as-is.
    pub fn raw<K>(keys: K) -> Self
    where
        K: KeySource + 'static,
    {
        Self::new(
            |value: &Vec<u8>| Ok(value.clone()),
            |bytes: &[u8]| Ok(bytes.to_vec()),
            keys,
        )
    }
}

impl<T> Clone for Settings<T> {
    fn clone(&self) -> Self {
        Self {
            serializer: Arc::clone(&self.serializer),
            deserializer: Arc::clone(&self.deserializer),
            keys: Arc::clone(&self.keys),
            decryption_keys: self.decryption_keys.clone(),
            tag_length: self.tag_length,
            engine: Arc::clone(&self.engine),
            nonce_source: Arc::clone(&self.nonce_source),
        }
    }
}

impl<T> fmt::Debug for Settings<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("tag_length", &self.tag_length)
            .field("custom_decryption_keys", &self.decryption_keys.is_some())
            .finish_non_exhaustive()
    }
}
