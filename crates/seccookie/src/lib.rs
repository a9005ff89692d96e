//! Tamper-evident envelopes for cookies and other untrusted channels.
//!
//! A [`SecCookieCodec`] turns a value into an opaque, authenticated byte
//! envelope and back:
//!
//! ```text
//! nonce (12 bytes) || AES-GCM ciphertext || tag (96 bits by default)
//! ```
//!
//! Any modification, truncation or wrong-key decryption is detected and
//! rejected. Keys come from a [`KeySource`] that is asked again on every call,
//! so keys can be rotated without breaking envelopes already handed out:
//!
//! ```
//! use seccookie::{Key, KeyRing, SecCookieCodec, Settings};
//!
//! let ring = KeyRing::new(Key::generate(16));
//! let codec = SecCookieCodec::new(Settings::<Vec<u8>>::raw(ring.clone())).unwrap();
//! let cookie = codec.seal_to_string(&b"user=42".to_vec()).unwrap();
//!
//! // Rotate: stage, promote, and later retire the old key.
//! let next = Key::generate(16);
//! ring.stage(next.clone()).unwrap();
//! ring.promote(&next).unwrap();
//!
//! assert_eq!(codec.open_str(&cookie).unwrap(), b"user=42");
//! ```
//!
//! Serialization, key storage and process wiring are the caller's concern.

pub mod codec;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod settings;

pub use codec::SecCookieCodec;
pub use crypto::{Algorithm, CipherError, TagLength};
pub use error::{BoxError, EnvelopeError, OpenFailure};
pub use keys::{Key, KeyRing, KeyRingError, KeySet, KeySource, StaticKey};
pub use settings::Settings;
