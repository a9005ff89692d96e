//! AEAD primitives used by the envelope codec.
//!
//! This module knows nothing about serialization or key rotation. It provides
//! the per-operation engines ([`cipher`]) and the nonces they consume
//! ([`nonce`]).

pub mod cipher;
pub mod nonce;

pub use cipher::{
    AeadEngine, AeadFactory, Algorithm, CipherError, CipherSuite, TagLength, NONCE_LEN,
};
pub use nonce::{NonceSource, OsNonceSource};
