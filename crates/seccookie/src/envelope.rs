//! Envelope wire format.
//!
//! ```text
//! nonce (12 bytes) || ciphertext || tag (tag length bytes)
//! ```
//!
//! There is no version byte, length prefix or key identifier. Both sides must
//! agree on the tag length; a mismatch surfaces as an authentication failure.
//!
//! The text form used in cookies is the same bytes as unpadded base64url.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use crate::crypto::{TagLength, NONCE_LEN};
use crate::error::EnvelopeError;

/// A borrowed, length-checked envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    nonce: &'a [u8; NONCE_LEN],
    sealed: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Smallest valid envelope for `tag_length`: a nonce and an empty
    /// ciphertext's tag.
    pub fn min_len(tag_length: TagLength) -> usize {
        NONCE_LEN + tag_length.bytes()
    }

    /// Split `bytes` into nonce and sealed payload.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Malformed`] if `bytes` is shorter than
    /// [`Envelope::min_len`].
    pub fn parse(bytes: &'a [u8], tag_length: TagLength) -> Result<Self, EnvelopeError> {
        let minimum = Self::min_len(tag_length);
        let malformed = || EnvelopeError::Malformed {
            actual: bytes.len(),
            minimum,
        };
        if bytes.len() < minimum {
            return Err(malformed());
        }
        let (nonce, sealed) = bytes.split_at(NONCE_LEN);
        let nonce: &'a [u8; NONCE_LEN] = nonce.try_into().map_err(|_| malformed())?;
        Ok(Self { nonce, sealed })
    }

    pub fn nonce(&self) -> &'a [u8; NONCE_LEN] {
        self.nonce
    }

    /// Ciphertext with the tag appended.
    pub fn sealed(&self) -> &'a [u8] {
        self.sealed
    }
}

/// Concatenate `nonce` and `sealed` into envelope bytes.
pub fn pack(nonce: &[u8; NONCE_LEN], sealed: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(nonce);
    out.extend_from_slice(sealed);
    out
}

/// Encode envelope bytes as cookie-safe text.
pub fn to_text(envelope: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(envelope)
}

/// Decode cookie text back to envelope bytes.
///
/// # Errors
///
/// Returns [`EnvelopeError::InvalidEncoding`] if `text` is not unpadded
/// base64url.
pub fn from_text(text: &str) -> Result<Vec<u8>, EnvelopeError> {
    Ok(URL_SAFE_NO_PAD.decode(text)?)
}
