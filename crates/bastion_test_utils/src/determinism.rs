//! Determinism testing utilities.
//!
//! A harness for verifying that the simulation produces identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! The simulation must be 100% deterministic for lockstep multiplayer and
//! save replay. Sources of non-determinism include:
//!
//! - **Floating-point math**: different CPUs can produce different
//!   results. The core uses integer math throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The tick always iterates in sorted asset id order.
//!
//! - **System randomness**: all random behavior flows through the one
//!   seeded PRNG serialized with the model.

use bastion_core::prelude::*;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Final state hash from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated per run.
    pub ticks: u64,
}

impl DeterminismResult {
    /// All unique hashes (should be exactly 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Build a model `runs` times with the same closure, drive each `ticks`
/// cycles, and compare final state hashes.
pub fn verify_determinism<F>(runs: usize, ticks: u64, build: F) -> DeterminismResult
where
    F: Fn() -> GameModel,
{
    let mut hashes = Vec::with_capacity(runs);
    for _ in 0..runs {
        let mut model = build();
        for _ in 0..ticks {
            model.tick();
        }
        hashes.push(model.state_hash());
    }
    let is_deterministic = hashes.windows(2).all(|pair| pair[0] == pair[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Drive two models in lockstep, comparing hashes every `stride` ticks.
/// Returns the cycle of the first divergence, if any.
pub fn first_divergence(
    a: &mut GameModel,
    b: &mut GameModel,
    ticks: u64,
    stride: u64,
) -> Option<u64> {
    for tick in 0..ticks {
        a.tick();
        b.tick();
        if stride > 0 && tick % stride == 0 && a.state_hash() != b.state_hash() {
            return Some(tick);
        }
    }
    if a.state_hash() == b.state_hash() {
        None
    } else {
        Some(ticks)
    }
}
