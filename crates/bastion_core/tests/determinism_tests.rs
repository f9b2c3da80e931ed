//! Replay-equality tests: same seed and same commands must reproduce
//! identical positions, hit points and ledgers.

use bastion_core::prelude::*;
use bastion_core::scenario;
use bastion_test_utils::determinism::{first_divergence, verify_determinism};
use proptest::prelude::*;

/// A scripted game: both sides order units around and fight.
fn scripted_model(seed: u64) -> GameModel {
    let mut setup = scenario::skirmish();
    setup.seed = seed;
    let mut model = setup.build().expect("skirmish builds");

    let ids = model.arena().sorted_ids();
    // Send every mobile blue asset toward the middle, red toward blue.
    for id in ids {
        let Some(asset) = model.asset(id) else { continue };
        let mobile = model
            .types(asset.color)
            .get(asset.kind)
            .is_mobile();
        if !mobile || asset.kind == AssetTypeKind::None {
            continue;
        }
        let goal = match asset.color {
            PlayerColor::Blue => TilePosition::new(30, 30),
            PlayerColor::Red => TilePosition::new(10, 10),
            _ => continue,
        };
        model
            .enqueue_capability(id, CapabilityId::Move, Target::terrain(goal.center()))
            .expect("order accepted");
    }
    model
}

#[test]
fn test_three_runs_agree() {
    verify_determinism(3, 150, || scripted_model(0x5eed)).assert_deterministic();
}

#[test]
fn test_lockstep_pair_never_diverges() {
    let mut a = scripted_model(99);
    let mut b = scripted_model(99);
    assert_eq!(first_divergence(&mut a, &mut b, 200, 10), None);
}

#[test]
fn test_different_seeds_diverge_eventually() {
    // Not a correctness requirement, but if every seed produced the same
    // battle the RNG would not be wired in at all.
    let mut a = scripted_model(1);
    let mut b = scripted_model(2);
    for _ in 0..200 {
        a.tick();
        b.tick();
    }
    assert_ne!(a.state_hash(), b.state_hash());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_same_seed_same_outcome(seed in any::<u64>()) {
        let mut a = scripted_model(seed);
        let mut b = scripted_model(seed);
        for _ in 0..60 {
            a.tick();
            b.tick();
        }
        prop_assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn prop_snapshot_resume_matches_original(seed in any::<u64>(), split in 1u64..40) {
        let mut original = scripted_model(seed);
        for _ in 0..split {
            original.tick();
        }
        let bytes = original.serialize().expect("serializes");
        let mut resumed = GameModel::deserialize(&bytes).expect("deserializes");
        for _ in 0..30 {
            original.tick();
            resumed.tick();
        }
        prop_assert_eq!(original.state_hash(), resumed.state_hash());
    }
}
