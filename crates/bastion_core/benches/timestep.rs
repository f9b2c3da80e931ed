//! Timestep throughput benchmarks.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use bastion_core::prelude::*;
use bastion_core::scenario;

fn skirmish_model() -> GameModel {
    let mut model = scenario::skirmish().build().expect("skirmish builds");
    for id in model.arena().sorted_ids() {
        let Some(asset) = model.asset(id) else { continue };
        if asset.kind != AssetTypeKind::Peasant {
            continue;
        }
        let goal = TilePosition::new(24, 24);
        let _ = model.enqueue_capability(id, CapabilityId::Move, Target::terrain(goal.center()));
    }
    model
}

fn bench_tick(c: &mut Criterion) {
    c.bench_function("tick_skirmish_100", |b| {
        b.iter_batched(
            skirmish_model,
            |mut model| {
                for _ in 0..100 {
                    model.tick();
                }
                model
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("state_hash_skirmish", |b| {
        let mut model = skirmish_model();
        for _ in 0..50 {
            model.tick();
        }
        b.iter(|| model.state_hash());
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
