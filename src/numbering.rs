use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::account::AccountNumber;

/// Source of candidate account numbers. Uniqueness is checked by the caller
/// against the store.
pub trait AccountNumberGenerator: Send {
    fn next_number(&mut self) -> AccountNumber;
}

pub struct RandomAccountNumberGenerator<R = StdRng> {
    rng: R,
    length: usize,
}

impl RandomAccountNumberGenerator<StdRng> {
    /// Deterministic sequence, for tests and reproducible imports.
    pub fn seeded(seed: u64, length: usize) -> Self {
        Self::new(StdRng::seed_from_u64(seed), length)
    }
}

impl<R: Rng> RandomAccountNumberGenerator<R> {
    pub fn new(rng: R, length: usize) -> Self {
        Self {
            rng,
            length: length.max(1),
        }
    }
}

impl<R: Rng + Send> AccountNumberGenerator for RandomAccountNumberGenerator<R> {
    fn next_number(&mut self) -> AccountNumber {
        let digits = (0..self.length)
            .map(|_| char::from(b'0' + self.rng.gen_range(0..10u8)))
            .collect();
        AccountNumber::from_digits(digits)
    }
}
