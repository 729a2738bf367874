use indexmap::IndexSet;
use rand_core::RngCore;
use rand_distr::{Distribution, Uniform};

use super::selector::draw_percentage;

/// Number of nonces remembered before the cache is reset
pub const NONCE_CACHE_CAPACITY: usize = 1000;

/// Bounded set of the nonces already used, in insertion order
#[derive(Debug, Clone)]
pub struct NonceCache {
    nonces: IndexSet<u32>,
    capacity: usize,
}

impl Default for NonceCache {
    fn default() -> Self {
        NonceCache::with_capacity(NONCE_CACHE_CAPACITY)
    }
}

impl NonceCache {
    pub fn with_capacity(capacity: usize) -> Self {
        NonceCache {
            nonces: IndexSet::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.nonces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nonces.is_empty()
    }

    pub fn contains(&self, nonce: u32) -> bool {
        self.nonces.contains(&nonce)
    }

    /// Draw a nonce absent from the cache and remember it. A full cache is cleared first.
    pub fn new_nonce(&mut self, rng: &mut impl RngCore) -> u32 {
        if self.nonces.len() >= self.capacity {
            self.nonces.clear();
        }
        loop {
            let nonce = rng.next_u32();
            if self.nonces.insert(nonce) {
                return nonce;
            }
        }
    }

    /// Pick one of the remembered nonces, or a new one if none is remembered
    pub fn old_nonce(&mut self, rng: &mut impl RngCore) -> u32 {
        if self.nonces.is_empty() {
            return self.new_nonce(rng);
        }
        let index = Uniform::new(0, self.nonces.len()).sample(rng);
        self.nonces[index]
    }

    /// Reuse a nonce with probability `duplication_percentage`, draw a fresh one otherwise
    pub fn next_nonce(&mut self, duplication_percentage: u8, rng: &mut impl RngCore) -> u32 {
        if duplication_percentage > 0 && draw_percentage(rng) <= duplication_percentage {
            self.old_nonce(rng)
        } else {
            self.new_nonce(rng)
        }
    }
}
