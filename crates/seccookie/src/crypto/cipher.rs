//! AES-GCM and AES-GCM-SIV engines behind a two-stage factory.
//!
//! [`CipherSuite::resolve`] runs once per codec and picks the implementation
//! for an [`Algorithm`]. [`AeadFactory::instantiate`] then runs once per seal
//! or open attempt and returns a fresh [`AeadEngine`] handle bound to a single
//! key. Handles are never shared between operations.
//!
//! **AES-GCM nonces must never repeat under the same key.** Every seal draws a
//! new random nonce; see [`crate::crypto::nonce`].

use std::{fmt, str::FromStr};

use aes_gcm::{
    aead::{
        consts::{U12, U13, U14, U15, U16},
        generic_array::GenericArray,
        Aead, AeadCore, KeyInit,
    },
    aes::{Aes128, Aes192, Aes256},
    AesGcm,
};
use aes_gcm_siv::{Aes128GcmSiv, Aes256GcmSiv};
use thiserror::Error;

use crate::keys::Key;

/// Byte length of every nonce (96 bits).
pub const NONCE_LEN: usize = 12;

/// Errors produced by the cipher layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// The key has a length the algorithm cannot use.
    #[error("invalid key length for {algorithm}: {actual} bytes")]
    InvalidKeyLength { algorithm: Algorithm, actual: usize },

    /// The tag length is not one of 96, 104, 112, 120 or 128 bits.
    #[error("unsupported tag length: {bits} bits")]
    UnsupportedTagLength { bits: u32 },

    /// The tag length is valid in general but not for this algorithm.
    #[error("{algorithm} does not support {bits}-bit tags")]
    TagLengthNotSupported { algorithm: Algorithm, bits: u32 },

    /// The algorithm name could not be parsed.
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Encryption failed inside the AEAD primitive.
    #[error("aead seal failed")]
    SealFailure,

    /// Authentication tag did not verify: wrong key, wrong tag length or
    /// tampered data.
    #[error("aead tag mismatch")]
    TagMismatch,
}

/// Authentication tag length. Valid values are 96 to 128 bits in 8-bit steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagLength(u8);

impl TagLength {
    /// 96-bit tag, used unless configured otherwise.
    pub const DEFAULT: Self = Self(12);

    /// 128-bit tag, the full GCM tag.
    pub const FULL: Self = Self(16);

    /// Validate a tag length given in bits.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::UnsupportedTagLength`] for anything other than
    /// 96, 104, 112, 120 or 128.
    pub fn from_bits(bits: u32) -> Result<Self, CipherError> {
        match bits {
            96 | 104 | 112 | 120 | 128 => Ok(Self((bits / 8) as u8)),
            other => Err(CipherError::UnsupportedTagLength { bits: other }),
        }
    }

    pub fn bits(self) -> u32 {
        u32::from(self.0) * 8
    }

    pub fn bytes(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for TagLength {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// AEAD algorithms a [`CipherSuite`] can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Algorithm {
    /// AES-GCM with a 128, 192 or 256-bit key and any supported tag length.
    #[default]
    AesGcm,
    /// AES-GCM-SIV (RFC 8452) with a 128 or 256-bit key and a 128-bit tag.
    AesGcmSiv,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::AesGcm => "aes-gcm",
            Algorithm::AesGcmSiv => "aes-gcm-siv",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-gcm" | "aes/gcm/nopadding" => Ok(Algorithm::AesGcm),
            "aes-gcm-siv" => Ok(Algorithm::AesGcmSiv),
            _ => Err(CipherError::UnknownAlgorithm(s.to_owned())),
        }
    }
}

/// A single-use AEAD handle bound to one key and one tag length.
pub trait AeadEngine: Send {
    /// Encrypt `plaintext`, returning ciphertext with the tag appended.
    fn seal(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CipherError>;

    /// Verify and decrypt `sealed` (ciphertext with the tag appended).
    fn open(&self, nonce: &[u8; NONCE_LEN], sealed: &[u8]) -> Result<Vec<u8>, CipherError>;
}

/// Issues a fresh [`AeadEngine`] for every operation.
///
/// Implementations must be safe to call from many threads at once.
#[cfg_attr(test, mockall::automock)]
pub trait AeadFactory: Send + Sync {
    /// Whether engines from this factory can produce tags of `tag_length`.
    fn supports(&self, tag_length: TagLength) -> bool;

    /// Build a new engine for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] if the key does not fit the
    /// algorithm, or a tag length error if `tag_length` is unsupported.
    fn instantiate(
        &self,
        key: &Key,
        tag_length: TagLength,
    ) -> Result<Box<dyn AeadEngine>, CipherError>;
}

type InstantiateFn = fn(&[u8], TagLength) -> Result<Box<dyn AeadEngine>, CipherError>;

/// Resolved, immutable description of an AEAD implementation.
///
/// Cheap to copy; holds the entry point chosen by [`CipherSuite::resolve`].
#[derive(Clone, Copy)]
pub struct CipherSuite {
    algorithm: Algorithm,
    instantiate: InstantiateFn,
}

impl CipherSuite {
    /// Resolve the implementation for `algorithm`.
    pub fn resolve(algorithm: Algorithm) -> Self {
        let instantiate: InstantiateFn = match algorithm {
            Algorithm::AesGcm => aes_gcm_engine,
            Algorithm::AesGcmSiv => aes_gcm_siv_engine,
        };
        Self {
            algorithm,
            instantiate,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

impl Default for CipherSuite {
    fn default() -> Self {
        Self::resolve(Algorithm::default())
    }
}

impl fmt::Debug for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherSuite")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl AeadFactory for CipherSuite {
    fn supports(&self, tag_length: TagLength) -> bool {
        match self.algorithm {
            Algorithm::AesGcm => true,
            Algorithm::AesGcmSiv => tag_length == TagLength::FULL,
        }
    }

    fn instantiate(
        &self,
        key: &Key,
        tag_length: TagLength,
    ) -> Result<Box<dyn AeadEngine>, CipherError> {
        (self.instantiate)(key.as_bytes(), tag_length)
    }
}

/// Adapts any RustCrypto AEAD with a 96-bit nonce to [`AeadEngine`].
struct Engine<C>(C);

impl<C> AeadEngine for Engine<C>
where
    C: Aead + AeadCore<NonceSize = U12> + Send,
{
    fn seal(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.0
            .encrypt(GenericArray::from_slice(&nonce[..]), plaintext)
            .map_err(|_| CipherError::SealFailure)
    }

    fn open(&self, nonce: &[u8; NONCE_LEN], sealed: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.0
            .decrypt(GenericArray::from_slice(&nonce[..]), sealed)
            .map_err(|_| CipherError::TagMismatch)
    }
}

fn engine<C>(algorithm: Algorithm, key: &[u8]) -> Result<Box<dyn AeadEngine>, CipherError>
where
    C: KeyInit + Aead + AeadCore<NonceSize = U12> + Send + 'static,
{
    let cipher = C::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength {
        algorithm,
        actual: key.len(),
    })?;
    Ok(Box::new(Engine(cipher)))
}

macro_rules! gcm_with_tag {
    ($aes:ty, $key:expr, $tag:expr) => {
        match $tag.bytes() {
            12 => engine::<AesGcm<$aes, U12, U12>>(Algorithm::AesGcm, $key),
            13 => engine::<AesGcm<$aes, U12, U13>>(Algorithm::AesGcm, $key),
            14 => engine::<AesGcm<$aes, U12, U14>>(Algorithm::AesGcm, $key),
            15 => engine::<AesGcm<$aes, U12, U15>>(Algorithm::AesGcm, $key),
            16 => engine::<AesGcm<$aes, U12, U16>>(Algorithm::AesGcm, $key),
            _ => Err(CipherError::UnsupportedTagLength { bits: $tag.bits() }),
        }
    };
}

fn aes_gcm_engine(key: &[u8], tag_length: TagLength) -> Result<Box<dyn AeadEngine>, CipherError> {
    match key.len() {
        16 => gcm_with_tag!(Aes128, key, tag_length),
        24 => gcm_with_tag!(Aes192, key, tag_length),
        32 => gcm_with_tag!(Aes256, key, tag_length),
        actual => Err(CipherError::InvalidKeyLength {
            algorithm: Algorithm::AesGcm,
            actual,
        }),
    }
}

fn aes_gcm_siv_engine(
    key: &[u8],
    tag_length: TagLength,
) -> Result<Box<dyn AeadEngine>, CipherError> {
    if tag_length != TagLength::FULL {
        return Err(CipherError::TagLengthNotSupported {
            algorithm: Algorithm::AesGcmSiv,
            bits: tag_length.bits(),
        });
    }
    match key.len() {
        16 => engine::<Aes128GcmSiv>(Algorithm::AesGcmSiv, key),
        32 => engine::<Aes256GcmSiv>(Algorithm::AesGcmSiv, key),
        actual => Err(CipherError::InvalidKeyLength {
            algorithm: Algorithm::AesGcmSiv,
            actual,
        }),
    }
}
