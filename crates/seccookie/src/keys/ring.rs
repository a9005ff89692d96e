//! [`KeyRing`]: rotating key source with lock-free reads.
//!
//! Rotation happens in three steps, each separated by at least the maximum
//! lifetime of an envelope:
//!
//! 1. [`KeyRing::stage`] the new key. It is accepted for decryption while the
//!    old key keeps sealing.
//! 2. [`KeyRing::promote`] the new key. It now seals; the old key is still
//!    accepted.
//! 3. [`KeyRing::retire`] the old key.
//!
//! The ring only applies steps it is asked to apply. Scheduling them is up to
//! the caller.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use thiserror::Error;
use tracing::info;

use super::{Key, KeySet, KeySource};

/// Errors produced by rotation steps.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyRingError {
    /// The key is already accepted for decryption.
    #[error("key {0} is already in the decryption set")]
    AlreadyPresent(String),

    /// Only keys already accepted for decryption can be promoted.
    #[error("key {0} must be staged before it can be promoted")]
    NotStaged(String),

    /// The current encryption key cannot be retired.
    #[error("key {0} is the active encryption key")]
    ActiveKey(String),

    /// The key is not in the decryption set.
    #[error("key {0} is not in the decryption set")]
    UnknownKey(String),
}

#[derive(Debug)]
struct RingState {
    encryption: Key,
    decryption: KeySet,
}

/// Thread-safe, rotating [`KeySource`].
///
/// Readers take an [`ArcSwap`] snapshot and never block. Rotation steps are
/// serialized by a writer lock and publish a whole new snapshot, so a reader
/// never sees a half-applied step.
#[derive(Clone, Debug)]
pub struct KeyRing {
    state: Arc<ArcSwap<RingState>>,
    writer: Arc<Mutex<()>>,
}

impl KeyRing {
    /// Create a ring that seals with `initial` and accepts only `initial`.
    pub fn new(initial: Key) -> Self {
        let state = RingState {
            decryption: vec![initial.clone()],
            encryption: initial,
        };
        Self {
            state: Arc::new(ArcSwap::from_pointee(state)),
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Accept `key` for decryption, after the keys already accepted.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::AlreadyPresent`] if the key is already accepted.
    pub fn stage(&self, key: Key) -> Result<(), KeyRingError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.state.load();
        if current.decryption.contains(&key) {
            return Err(KeyRingError::AlreadyPresent(key.fingerprint()));
        }
        let mut decryption = current.decryption.clone();
        info!(key_id = %key.fingerprint(), "decryption key staged");
        decryption.push(key);
        self.state.store(Arc::new(RingState {
            encryption: current.encryption.clone(),
            decryption,
        }));
        Ok(())
    }

    /// Seal with `key` from now on.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::NotStaged`] unless the key is already accepted
    /// for decryption.
    pub fn promote(&self, key: &Key) -> Result<(), KeyRingError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.state.load();
        if !current.decryption.contains(key) {
            return Err(KeyRingError::NotStaged(key.fingerprint()));
        }
        info!(
            key_id = %key.fingerprint(),
            previous_key_id = %current.encryption.fingerprint(),
            "encryption key promoted"
        );
        self.state.store(Arc::new(RingState {
            encryption: key.clone(),
            decryption: current.decryption.clone(),
        }));
        Ok(())
    }

    /// Stop accepting `key` for decryption.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::ActiveKey`] if `key` still seals, or
    /// [`KeyRingError::UnknownKey`] if it is not accepted.
    pub fn retire(&self, key: &Key) -> Result<(), KeyRingError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.state.load();
        if current.encryption == *key {
            return Err(KeyRingError::ActiveKey(key.fingerprint()));
        }
        let before = current.decryption.len();
        let decryption: KeySet = current
            .decryption
            .iter()
            .filter(|k| *k != key)
            .cloned()
            .collect();
        if decryption.len() == before {
            return Err(KeyRingError::UnknownKey(key.fingerprint()));
        }
        info!(key_id = %key.fingerprint(), "decryption key retired");
        self.state.store(Arc::new(RingState {
            encryption: current.encryption.clone(),
            decryption,
        }));
        Ok(())
    }
}

impl KeySource for KeyRing {
    fn encryption_key(&self) -> Key {
        self.state.load().encryption.clone()
    }

    fn decryption_keys(&self) -> KeySet {
        self.state.load().decryption.clone()
    }
}
