//! Benchmark: registry and status hot paths

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use loadphase::{AssetKind, AssetLoadTask, AssetLoader, LoaderConfig, PhaseConfig, PhaseMachine};

fn loader_with_tasks(count: usize) -> AssetLoader {
    let machine = PhaseMachine::new(PhaseConfig::zero_dwell());
    let loader = AssetLoader::new(machine, LoaderConfig::default());
    for i in 0..count {
        loader.add_asset(
            AssetLoadTask::new(format!("asset_{i}"), AssetKind::Texture, || async {
                anyhow::Ok(())
            })
            .with_priority((i % 10) as i32),
        );
    }
    loader
}

fn loader_hot_paths_benchmark(c: &mut Criterion) {
    let loader = loader_with_tasks(1000);

    // Re-registration is the redundant-call fast path UI code hits on
    // every re-render
    c.bench_function("add_asset_duplicate", |b| {
        let dup = AssetLoadTask::new("asset_500", AssetKind::Texture, || async { anyhow::Ok(()) });
        b.iter(|| loader.add_asset(black_box(dup.clone())))
    });

    c.bench_function("phase_progress_counts", |b| {
        b.iter(|| black_box(loader.phase_progress(loadphase::LoadingPhase::Important)))
    });

    c.bench_function("status_snapshot", |b| {
        b.iter(|| black_box(loader.phases().status()))
    });

    c.bench_function("spatial_candidates_empty", |b| {
        b.iter(|| black_box(loader.spatial_candidates().len()))
    });
}

criterion_group!(benches, loader_hot_paths_benchmark);
criterion_main!(benches);
