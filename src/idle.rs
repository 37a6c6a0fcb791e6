//! Idle-time background queue
//!
//! Opportunistic path for the lowest-priority tier: cosmetic assets load one
//! per idle slice so a single slice never balloons in duration, with the
//! interval itself acting as the timeout fallback on idle-starved hosts.
//! Throughput-agnostic; correctness requires only that it never monopolizes
//! the executor.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use log::warn;
use parking_lot::Mutex;
use tokio::time::sleep;

use crate::config::IdleConfig;
use crate::error::LoadError;
use crate::loader::AssetLoader;
use crate::task::AssetLoadTask;

/// FIFO of background tasks drained one per idle slice
///
/// Cheaply cloneable handle; clones share the queue. Completions flow through
/// the loader's accounting, so idle-loaded assets still count toward their
/// phase's progress.
#[derive(Clone)]
pub struct IdleBackgroundQueue {
    queue: Arc<Mutex<VecDeque<AssetLoadTask>>>,
    running: Arc<AtomicBool>,
    /// Bumped on clear to cancel the in-flight processor
    epoch: Arc<AtomicU64>,
    loader: AssetLoader,
    config: Arc<IdleConfig>,
}

impl IdleBackgroundQueue {
    pub fn new(loader: AssetLoader, config: IdleConfig) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            running: Arc::new(AtomicBool::new(false)),
            epoch: Arc::new(AtomicU64::new(0)),
            loader,
            config: Arc::new(config),
        }
    }

    /// Append tasks and start processing if idle
    ///
    /// Already-queued and already-loaded ids are skipped. Accepted tasks are
    /// recorded under their phase's totals immediately so progress
    /// denominators don't lag behind the queue.
    pub fn queue_assets(&self, tasks: Vec<AssetLoadTask>) {
        {
            let mut queue = self.queue.lock();
            for task in tasks {
                if self.loader.is_loaded(&task.id) || queue.iter().any(|t| t.id == task.id) {
                    continue;
                }
                self.loader.track_member(task.resolved_phase(), &task.id);
                queue.push_back(task);
            }
        }
        self.ensure_processor();
    }

    /// Empty the queue and cancel the pending processor
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.queue.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    fn ensure_processor(&self) {
        if self.queue.lock().is_empty() || self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = self.clone();
        let epoch = self.epoch.load(Ordering::SeqCst);
        tokio::spawn(async move {
            this.run_processor(epoch).await;
        });
    }

    /// One task per idle slice; re-schedules itself while the queue is
    /// non-empty
    async fn run_processor(self, epoch: u64) {
        loop {
            sleep(self.config.idle_interval).await;
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            let next = { self.queue.lock().pop_front() };
            let task = match next {
                Some(task) => task,
                None => {
                    self.running.store(false, Ordering::SeqCst);
                    // Re-check: a queue_assets between the pop and the store
                    // would otherwise see running=true and not restart us
                    if self.queue.lock().is_empty() || self.running.swap(true, Ordering::SeqCst) {
                        return;
                    }
                    continue;
                }
            };
            let phase = task.resolved_phase();
            if let Err(reason) = (task.load)().await {
                let err = LoadError::Operation {
                    id: task.id.clone(),
                    reason,
                };
                warn!("{err}; continuing without asset");
            }
            self.loader.mark_asset_loaded(&task.id, Some(phase));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoaderConfig, PhaseConfig};
    use crate::phase::PhaseMachine;
    use crate::task::AssetKind;

    fn test_queue() -> IdleBackgroundQueue {
        let machine = PhaseMachine::new(PhaseConfig::zero_dwell());
        let loader = AssetLoader::new(machine, LoaderConfig::default());
        IdleBackgroundQueue::new(loader, IdleConfig::default())
    }

    fn bg_task(id: &str) -> AssetLoadTask {
        AssetLoadTask::new(id, AssetKind::Sound, || async { anyhow::Ok(()) })
            .in_phase(crate::phase::LoadingPhase::Background)
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_dedupes_by_id() {
        let queue = test_queue();
        queue.queue_assets(vec![bg_task("wind"), bg_task("wind"), bg_task("rain")]);
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_empties_queue() {
        let queue = test_queue();
        queue.queue_assets(vec![bg_task("wind"), bg_task("rain")]);
        queue.clear();
        assert!(queue.is_empty());
    }
}
