//! Random nonce sources.
//!
//! The codec keeps no record of issued nonces; uniqueness under a key rests
//! entirely on the source being a uniformly random CSPRNG.

use std::sync::{Mutex, PoisonError};

use aes_gcm::aead::{
    rand_core::{CryptoRng, RngCore},
    OsRng,
};

use super::cipher::NONCE_LEN;

/// Supplies a fresh nonce for every seal.
///
/// Implementations must be safe for concurrent use.
#[cfg_attr(test, mockall::automock)]
pub trait NonceSource: Send + Sync {
    /// Overwrite `nonce` with fresh random bytes.
    fn fill(&self, nonce: &mut [u8; NONCE_LEN]);
}

/// Nonces drawn from the operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsNonceSource;

impl NonceSource for OsNonceSource {
    fn fill(&self, nonce: &mut [u8; NONCE_LEN]) {
        OsRng.fill_bytes(nonce);
    }
}

/// Any cryptographic RNG behind a mutex, e.g. a seeded generator in tests.
impl<R> NonceSource for Mutex<R>
where
    R: RngCore + CryptoRng + Send,
{
    fn fill(&self, nonce: &mut [u8; NONCE_LEN]) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_bytes(nonce);
    }
}

/// Draw a new nonce from `source`.
pub fn fresh_nonce(source: &dyn NonceSource) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    source.fill(&mut nonce);
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counter-mode stand-in for a seeded CSPRNG.
    struct CountingRng(u8);

    impl RngCore for CountingRng {
        fn next_u32(&mut self) -> u32 {
            self.0 = self.0.wrapping_add(1);
            u32::from(self.0)
        }

        fn next_u64(&mut self) -> u64 {
            u64::from(self.next_u32())
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for b in dest.iter_mut() {
                self.0 = self.0.wrapping_add(1);
                *b = self.0;
            }
        }

        fn try_fill_bytes(
            &mut self,
            dest: &mut [u8],
        ) -> Result<(), aes_gcm::aead::rand_core::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for CountingRng {}

    #[test]
    fn os_nonces_differ() {
        let a = fresh_nonce(&OsNonceSource);
        let b = fresh_nonce(&OsNonceSource);
        assert_ne!(a, b);
    }

    #[test]
    fn mutex_wrapped_rng_is_a_source() {
        let source = Mutex::new(CountingRng(0));
        let first = fresh_nonce(&source);
        let second = fresh_nonce(&source);
        assert_eq!(first, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        assert_eq!(second[0], 13);
    }
}
