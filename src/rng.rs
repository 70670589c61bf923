// src/rng.rs
//! Random Number Streams for Simulation and Calibration
//!
//! # Design
//!
//! Every routine that draws random numbers takes its randomness explicitly:
//! 1. **Reproducibility**: same seed → same prices and calibrated parameters
//! 2. **Parallel safety**: each worker draws from its own substream
//! 3. **Thread-count independence**: substreams are addressed by index, not by
//!    the thread that happens to run them
//!
//! # Stream Derivation
//!
//! Seeds are derived with the splitmix64 finalizer:
//! ```text
//! z = seed + golden_gamma * (id + 1)
//! z = (z ⊕ (z >> 30)) * 0xbf58476d1ce4e5b9
//! z = (z ⊕ (z >> 27)) * 0x94d049bb133111eb
//! output = z ⊕ (z >> 31)
//! ```
//! A factory can spawn child factories (one per calibration run, one per
//! optimizer generation) and leaf `StdRng` substreams (one per evaluation,
//! repetition or path batch).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// Mix a base seed and a stream index into a new, decorrelated seed
pub fn mix_seed(base_seed: u64, stream_id: u64) -> u64 {
    let mut z = base_seed.wrapping_add(GOLDEN_GAMMA.wrapping_mul(stream_id.wrapping_add(1)));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9u64);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111ebu64);
    z ^ (z >> 31)
}

/// Deterministic source of independent random substreams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngFactory {
    base_seed: u64,
}

impl RngFactory {
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed }
    }

    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Child factory for a nested scope (a calibration run, a generation, ...)
    pub fn child(&self, scope_id: u64) -> RngFactory {
        RngFactory::new(mix_seed(self.base_seed ^ 0x5851_f42d_4c95_7f2d, scope_id))
    }

    /// Leaf generator for one independent unit of work
    pub fn substream(&self, stream_id: u64) -> StdRng {
        StdRng::seed_from_u64(mix_seed(self.base_seed, stream_id))
    }
}

pub fn seed_rng_from_u64(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn get_normal_draw<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}
