//! Integration tests for the idle-time background queue: one task per idle
//! slice, progress accounting, and cancellation on clear.

use std::time::Duration;

use loadphase::{
    AssetKind, AssetLoadTask, AssetLoader, IdleBackgroundQueue, IdleConfig, LoaderConfig,
    LoadingPhase, PhaseConfig, PhaseMachine,
};
use tokio::time::sleep;

fn test_queue(idle_interval: Duration) -> (IdleBackgroundQueue, AssetLoader) {
    let machine = PhaseMachine::new(PhaseConfig::zero_dwell());
    let loader = AssetLoader::new(machine, LoaderConfig::default());
    let queue = IdleBackgroundQueue::new(loader.clone(), IdleConfig { idle_interval });
    (queue, loader)
}

fn bg_task(id: &str) -> AssetLoadTask {
    AssetLoadTask::new(id, AssetKind::Sound, || async { anyhow::Ok(()) })
        .in_phase(LoadingPhase::Background)
}

#[tokio::test(start_paused = true)]
async fn test_one_task_per_idle_slice() {
    let (queue, loader) = test_queue(Duration::from_millis(20));
    queue.queue_assets(vec![bg_task("wind"), bg_task("rain"), bg_task("birds")]);

    // Only the first slice has elapsed
    sleep(Duration::from_millis(25)).await;
    assert_eq!(loader.loaded_count(), 1);

    sleep(Duration::from_millis(50)).await;
    assert_eq!(loader.loaded_count(), 3);
    assert!(queue.is_empty());
    assert_eq!(loader.phase_progress(LoadingPhase::Background), (3, 3));
}

#[tokio::test(start_paused = true)]
async fn test_queue_counts_toward_phase_totals_upfront() {
    let (queue, loader) = test_queue(Duration::from_millis(20));
    queue.queue_assets(vec![bg_task("wind"), bg_task("rain")]);
    // Denominators reflect queued work before any of it loads
    assert_eq!(loader.phase_progress(LoadingPhase::Background), (0, 2));
}

#[tokio::test(start_paused = true)]
async fn test_clear_cancels_pending_work() {
    let (queue, loader) = test_queue(Duration::from_millis(20));
    queue.queue_assets(vec![bg_task("wind"), bg_task("rain")]);
    queue.clear();

    sleep(Duration::from_millis(500)).await;
    assert_eq!(loader.loaded_count(), 0);
    assert!(queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failing_idle_load_is_still_marked() {
    let (queue, loader) = test_queue(Duration::from_millis(20));
    queue.queue_assets(vec![AssetLoadTask::new(
        "corrupt_ambience",
        AssetKind::Sound,
        || async { Err(anyhow::anyhow!("decode error")) },
    )
    .in_phase(LoadingPhase::Background)]);

    sleep(Duration::from_millis(50)).await;
    assert!(loader.is_loaded("corrupt_ambience"));
    assert_eq!(loader.phase_progress(LoadingPhase::Background), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn test_queue_restarts_after_draining() {
    let (queue, loader) = test_queue(Duration::from_millis(20));
    queue.queue_assets(vec![bg_task("wind")]);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(loader.loaded_count(), 1);

    // A later batch spins the processor back up
    queue.queue_assets(vec![bg_task("rain")]);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(loader.loaded_count(), 2);
}
