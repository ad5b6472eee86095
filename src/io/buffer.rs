//! Synthetic workload generation
//!
//! Random data buffers (incompressible, so filesystems with transparent
//! compression cannot cheat) and block-aligned random offsets.

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};

/// Source of benchmark data and random offsets
pub struct WorkloadGenerator {
    rng: SmallRng,
}

impl WorkloadGenerator {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Deterministic generator for reproducible offset sequences
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// A buffer of `size` random bytes
    pub fn data(&mut self, size: usize) -> Vec<u8> {
        let mut buffer = vec![0u8; size];
        self.rng.fill_bytes(&mut buffer);
        buffer
    }

    /// Uniform block-aligned offset such that `offset + block_size <= file_size`
    pub fn aligned_offset(&mut self, file_size: u64, block_size: u64) -> u64 {
        if block_size == 0 || file_size < block_size {
            return 0;
        }
        let slots = (file_size - block_size) / block_size;
        self.rng.gen_range(0..=slots) * block_size
    }
}

impl Default for WorkloadGenerator {
    fn default() -> Self {
        Self::new()
    }
}
