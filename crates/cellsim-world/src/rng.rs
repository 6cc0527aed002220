//! Injectable randomness.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Source of the integer draws the simulation makes.
///
/// Every stochastic decision goes through this trait so a seeded generator
/// reproduces a run exactly and tests can script the outcome of each draw.
pub trait RandomSource {
    /// Uniform integer in `[0, upper)`. `upper` is never zero.
    fn roll(&mut self, upper: u32) -> u32;
}

impl RandomSource for ChaCha8Rng {
    fn roll(&mut self, upper: u32) -> u32 {
        self.gen_range(0..upper)
    }
}
