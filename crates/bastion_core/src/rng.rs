//! Seeded deterministic random number generation.
//!
//! The simulation draws randomness for exactly two things: the per-tick
//! asset turn order and melee damage variance. Both must replay identically
//! from the same seed, so the generator state is part of the serialized
//! model.
//!
//! This is `xoshiro256**` seeded via SplitMix64.

use serde::{Deserialize, Serialize};

/// Deterministic PRNG with 256-bit state, suitable for snapshots/replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRng {
    state: [u64; 4],
}

impl GameRng {
    /// Seed the generator from a single 64-bit value.
    #[must_use]
    pub fn seed_from_u64(seed: u64) -> Self {
        let mut sm = SplitMix64 { state: seed };
        Self {
            state: [sm.next(), sm.next(), sm.next(), sm.next()],
        }
    }

    /// Next raw 64-bit draw.
    pub fn next_u64(&mut self) -> u64 {
        // xoshiro256**
        let result = self.state[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);

        let t = self.state[1] << 17;

        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];

        self.state[2] ^= t;

        self.state[3] = self.state[3].rotate_left(45);

        result
    }

    /// Next 32-bit draw (upper half of a 64-bit draw).
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Fair coin flip. One draw per call.
    pub fn next_bool(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }

    /// The raw state words, for state hashing.
    #[must_use]
    pub const fn state_words(&self) -> [u64; 4] {
        self.state
    }

    /// Uniform draw in `[0, bound)` via rejection sampling.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is zero.
    pub fn roll(&mut self, bound: u32) -> u32 {
        assert!(bound > 0, "empty range");
        let threshold = u32::MAX - (u32::MAX % bound);
        loop {
            let x = self.next_u32();
            if x < threshold {
                return x % bound;
            }
        }
    }
}

struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = GameRng::seed_from_u64(42);
        let mut b = GameRng::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = GameRng::seed_from_u64(1);
        let mut b = GameRng::seed_from_u64(2);
        let first: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
        let second: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
        assert_ne!(first, second);
    }

    #[test]
    fn test_roll_stays_in_range() {
        let mut rng = GameRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert!(rng.roll(13) < 13);
        }
    }

    #[test]
    fn test_serde_round_trip_preserves_stream() {
        let mut rng = GameRng::seed_from_u64(99);
        rng.next_u64();
        let bytes = bincode::serialize(&rng).unwrap();
        let mut restored: GameRng = bincode::deserialize(&bytes).unwrap();
        assert_eq!(rng.next_u64(), restored.next_u64());
    }
}
