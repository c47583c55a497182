// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cryptographically-secure randomness.
use std::sync::Mutex;

use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::{SeedableRng, TryRngCore};
use thiserror::Error;

/// Cryptographically-secure random number generator based on the ChaCha20 algorithm.
///
/// The generator is seeded from the operating system and can be shared between threads; all
/// splitting calls of one key generation may draw from the same instance concurrently.
#[derive(Debug)]
pub struct Rng {
    inner: Mutex<ChaCha20Rng>,
}

impl Default for Rng {
    fn default() -> Self {
        Self {
            inner: Mutex::new(ChaCha20Rng::from_os_rng()),
        }
    }
}

#[cfg(any(test, feature = "test_utils"))]
impl Rng {
    /// Returns a deterministic generator for reproducible tests.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            inner: Mutex::new(ChaCha20Rng::from_seed(seed)),
        }
    }
}

impl Rng {
    /// Fills a fixed-size array with random bytes.
    pub fn random_array<const N: usize>(&self) -> Result<[u8; N], RngError> {
        let mut inner = self.inner.lock().map_err(|_| RngError::LockPoisoned)?;
        let mut out = [0u8; N];
        inner
            .try_fill_bytes(&mut out)
            .map_err(|_| RngError::NotEnoughRandomness)?;
        Ok(out)
    }
}

#[derive(Debug, Error)]
pub enum RngError {
    #[error("rng lock is poisoned")]
    LockPoisoned,

    #[error("unable to collect enough randomness")]
    NotEnoughRandomness,
}

#[cfg(test)]
mod tests {
    use super::Rng;

    #[test]
    fn seeded_rng_is_deterministic() {
        let sample_1: [u8; 32] = Rng::from_seed([7; 32]).random_array().unwrap();
        let sample_2: [u8; 32] = Rng::from_seed([7; 32]).random_array().unwrap();
        let sample_3: [u8; 32] = Rng::from_seed([8; 32]).random_array().unwrap();

        assert_eq!(sample_1, sample_2);
        assert_ne!(sample_1, sample_3);
    }
}
