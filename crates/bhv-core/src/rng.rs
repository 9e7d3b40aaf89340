//! Deterministic per-behavior RNG.
//!
//! Each behavior that needs randomness gets its own `SmallRng` seeded by:
//!
//!   seed = global_seed XOR (behavior_id * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive IDs uniformly across the seed space, so adding a
//! behavior to the end of a behavior set does not disturb the choices made by
//! existing ones.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::BehaviorId;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Per-behavior deterministic RNG.
pub struct BehaviorRng(SmallRng);

impl BehaviorRng {
    /// Seed deterministically from the run's global seed and a behavior ID.
    pub fn new(global_seed: u64, behavior: BehaviorId) -> Self {
        let seed = global_seed ^ (behavior.0 as u64).wrapping_mul(MIXING_CONSTANT);
        BehaviorRng(SmallRng::seed_from_u64(seed))
    }

    /// Expose the inner `SmallRng` for use with `rand` distribution types.
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Choose a random element from a slice.
    /// Returns `None` if the slice is empty.
    #[inline]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.0)
    }
}

impl std::fmt::Debug for BehaviorRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BehaviorRng")
    }
}
