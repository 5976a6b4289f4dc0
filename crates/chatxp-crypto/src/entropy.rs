//! Entropy abstraction for key and nonce generation.
//!
//! Every random value in the crypto core (identity keys, ephemeral keys,
//! nonces, group keys) is drawn through [`Entropy`]. Production code uses
//! [`SystemEntropy`]; tests can inject a seeded source.

use std::sync::Arc;

/// Source of random bytes.
///
/// # Invariants
///
/// - Production implementations MUST use a cryptographically secure RNG
/// - Successive calls MUST NOT repeat output (nonce freshness depends on it)
/// - Failure of the underlying source is unrecoverable and panics
pub trait Entropy: Send + Sync {
    /// Fills the provided buffer with random bytes.
    fn fill_bytes(&self, buffer: &mut [u8]);

    /// Returns a fresh array of random bytes.
    fn random_array<const N: usize>(&self) -> [u8; N]
    where
        Self: Sized,
    {
        let mut bytes = [0u8; N];
        self.fill_bytes(&mut bytes);
        bytes
    }
}

impl<T: Entropy + ?Sized> Entropy for &T {
    fn fill_bytes(&self, buffer: &mut [u8]) {
        (**self).fill_bytes(buffer);
    }
}

impl<T: Entropy + ?Sized> Entropy for Arc<T> {
    fn fill_bytes(&self, buffer: &mut [u8]) {
        (**self).fill_bytes(buffer);
    }
}

/// OS cryptographic RNG (getrandom).
///
/// # Panics
///
/// Panics if the OS RNG fails. No message can be sealed or opened without
/// keys and nonces, so continuing would be meaningless.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEntropy;

impl SystemEntropy {
    /// Create a new system entropy source.
    pub fn new() -> Self {
        Self
    }
}

impl Entropy for SystemEntropy {
    #[allow(clippy::expect_used)]
    fn fill_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - cannot generate keys or nonces");
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use seeded::SeededEntropy;

#[cfg(any(test, feature = "test-utils"))]
mod seeded {
    #![allow(clippy::expect_used, reason = "Test-only entropy source")]

    use std::sync::Mutex;

    use rand_chacha::{
        ChaCha20Rng,
        rand_core::{RngCore, SeedableRng},
    };

    use super::Entropy;

    /// Deterministic entropy for tests.
    ///
    /// Same seed produces the same byte sequence; successive draws differ.
    /// Never use outside tests.
    #[derive(Debug)]
    pub struct SeededEntropy {
        rng: Mutex<ChaCha20Rng>,
    }

    impl SeededEntropy {
        /// Create a seeded source.
        pub fn new(seed: u64) -> Self {
            Self { rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)) }
        }
    }

    impl Entropy for SeededEntropy {
        fn fill_bytes(&self, buffer: &mut [u8]) {
            self.rng.lock().expect("Mutex poisoned").fill_bytes(buffer);
        }
    }
}
