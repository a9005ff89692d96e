//! Errors returned by [`SecCookieCodec`](crate::SecCookieCodec).

use std::fmt;

use thiserror::Error;

use crate::crypto::CipherError;

/// Boxed error produced by a caller-supplied serializer or deserializer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One failed decryption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFailure {
    /// Position of the key in the decryption key set.
    pub key_index: usize,
    /// Why the attempt failed.
    pub cause: CipherError,
}

impl fmt::Display for OpenFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key #{}: {}", self.key_index, self.cause)
    }
}

impl std::error::Error for OpenFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Codec error.
///
/// Callers should treat every variant for which
/// [`EnvelopeError::is_rejection`] is `true` as "reject this input" and never
/// try to repair it.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The envelope is shorter than a nonce plus a tag.
    #[error("malformed envelope: {actual} bytes, at least {minimum} expected for current settings")]
    Malformed { actual: usize, minimum: usize },

    /// The text form of the envelope is not unpadded base64url.
    #[error("envelope text is not valid base64url: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    /// No key in the decryption set authenticated the envelope.
    #[error("envelope authentication failed for all {} key(s)", .failures.len())]
    AuthenticationFailure { failures: Vec<OpenFailure> },

    /// The decryption key set was empty.
    #[error("no decryption keys configured")]
    NoDecryptionKeys,

    /// The write path could not seal the plaintext.
    #[error("failed to seal envelope: {0}")]
    Seal(#[source] CipherError),

    /// The caller's serializer or deserializer failed. The original error is
    /// kept unchanged and can be recovered with `downcast_ref`.
    #[error("serialization failed: {0}")]
    Serialization(#[source] BoxError),
}

impl EnvelopeError {
    /// `true` when the input itself is bad (malformed, badly encoded or
    /// not authentic), as opposed to a configuration or caller error.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EnvelopeError::Malformed { .. }
                | EnvelopeError::InvalidEncoding(_)
                | EnvelopeError::AuthenticationFailure { .. }
        )
    }

    /// Causes recorded for each failed key, empty for other variants.
    pub fn failures(&self) -> &[OpenFailure] {
        match self {
            EnvelopeError::AuthenticationFailure { failures } => failures,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_classification() {
        assert!(EnvelopeError::Malformed {
            actual: 3,
            minimum: 24
        }
        .is_rejection());
        assert!(EnvelopeError::AuthenticationFailure { failures: vec![] }.is_rejection());
        assert!(!EnvelopeError::NoDecryptionKeys.is_rejection());
        assert!(!EnvelopeError::Seal(CipherError::SealFailure).is_rejection());
        assert!(!EnvelopeError::Serialization("boom".into()).is_rejection());
    }

    #[test]
    fn display_includes_lengths_and_counts() {
        let e = EnvelopeError::Malformed {
            actual: 13,
            minimum: 24,
        };
        assert!(e.to_string().contains("13 bytes"));
        assert!(e.to_string().contains("24"));

        let e = EnvelopeError::AuthenticationFailure {
            failures: vec![
                OpenFailure {
                    key_index: 0,
                    cause: CipherError::TagMismatch,
                },
                OpenFailure {
                    key_index: 1,
                    cause: CipherError::TagMismatch,
                },
            ],
        };
        assert!(e.to_string().contains("all 2 key(s)"));
        assert_eq!(e.failures()[1].key_index, 1);
    }

    #[test]
    fn serialization_error_is_preserved() {
        let inner = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad utf-8");
        let e = EnvelopeError::Serialization(Box::new(inner));
        let EnvelopeError::Serialization(source) = e else {
            panic!("wrong variant");
        };
        let io = source.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidData);
    }
}
