//! Concurrency-gated asset loader
//!
//! Drains the registry in priority order under an in-flight ceiling and
//! reports per-phase completion ratios to the phase machine. Start order
//! within a phase respects priority; completion order is unspecified.
//!
//! The ceiling is a counting semaphore rather than a busy-wait slot poll:
//! waiters wake on release and the bound is exact. Its purpose is to cap
//! simultaneous outstanding requests, not to serialize CPU work.

pub mod registry;

pub use registry::SpatialCandidate;

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Instant};

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::phase::{LoadingPhase, PhaseMachine};
use crate::task::AssetLoadTask;
use registry::Registry;

/// Priority-ordered, concurrency-gated loader with fail-soft semantics
///
/// Cheaply cloneable handle; clones share the registry, loaded-set, and gate.
///
/// Failure policy: a rejecting load operation is logged and the task is
/// marked loaded anyway. One broken asset must never stall phase progress or
/// block world entry; the cost is a missing visual, not a frozen screen.
#[derive(Clone)]
pub struct AssetLoader {
    registry: Arc<Mutex<Registry>>,
    loaded: Arc<Mutex<HashSet<String>>>,
    gate: Arc<Semaphore>,
    machine: PhaseMachine,
    config: Arc<LoaderConfig>,
}

impl AssetLoader {
    pub fn new(machine: PhaseMachine, config: LoaderConfig) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::new())),
            loaded: Arc::new(Mutex::new(HashSet::new())),
            gate: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            machine,
            config: Arc::new(config),
        }
    }

    /// The phase machine this loader reports into
    pub fn phases(&self) -> &PhaseMachine {
        &self.machine
    }

    /// Register a task; idempotent on id
    ///
    /// A no-op when the id is already pending, in flight, or loaded, so UI
    /// code may re-register on every re-render without running a load twice.
    /// Resolves the default phase from the criticality flag.
    pub fn add_asset(&self, mut task: AssetLoadTask) {
        task.phase = Some(task.resolved_phase());
        let mut registry = self.registry.lock();
        if self.loaded.lock().contains(&task.id) {
            return;
        }
        registry.insert(task);
    }

    /// Load every not-yet-loaded task registered under a phase
    ///
    /// Polls a bounded number of times for tasks to appear; a phase with
    /// nothing registered after that is declared satisfied at 100% rather
    /// than waited on forever. "No tasks" is nothing to block on, not an
    /// error.
    pub async fn load_phase(&self, phase: LoadingPhase) {
        if phase == LoadingPhase::Complete {
            return;
        }
        let mut attempts = 0;
        while self.registry.lock().member_count(phase) == 0 {
            if attempts >= self.config.poll_attempts {
                debug!("no {phase} assets registered after {attempts} checks, marking phase satisfied");
                self.machine.update_phase_progress(phase, 100.0);
                return;
            }
            attempts += 1;
            sleep(self.config.poll_interval).await;
        }
        let tasks = self.registry.lock().take_phase(phase);
        self.load_batch(tasks).await;
        self.report_phase_progress(phase);
    }

    /// Run a batch through the gate; starts follow the batch order
    pub(crate) async fn load_batch(&self, tasks: Vec<AssetLoadTask>) {
        let mut handles = Vec::with_capacity(tasks.len());
        for task in tasks {
            let permit = match Arc::clone(&self.gate).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let loader = self.clone();
            handles.push(tokio::spawn(async move {
                let phase = task.resolved_phase();
                let started = Instant::now();
                let result = (task.load)().await;
                drop(permit);
                match result {
                    Ok(()) => {
                        debug!("loaded {} ({:?}) in {:?}", task.id, task.kind, started.elapsed());
                    }
                    Err(reason) => {
                        let err = LoadError::Operation {
                            id: task.id.clone(),
                            reason,
                        };
                        warn!("{err}; continuing without asset");
                    }
                }
                loader.finish_task(&task.id, phase);
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Announce completion of an externally-managed load; idempotent
    ///
    /// A pending task with the same id takes its registered phase; otherwise
    /// the given phase applies, defaulting to important.
    pub fn mark_asset_loaded(&self, id: &str, phase: Option<LoadingPhase>) {
        let resolved = {
            let mut registry = self.registry.lock();
            let mut loaded = self.loaded.lock();
            if loaded.contains(id) {
                return;
            }
            let resolved = match registry.remove(id) {
                Some(task) => task.resolved_phase(),
                None => phase.unwrap_or(LoadingPhase::Important),
            };
            registry.note_member(resolved, id);
            loaded.insert(id.to_string());
            resolved
        };
        self.report_phase_progress(resolved);
    }

    /// Pull the named pending tasks out of the registry and load them now
    ///
    /// Used by the prefetcher to promote spatially-near work ahead of its
    /// phase being drained.
    pub async fn promote(&self, ids: &[String]) {
        let tasks = self.registry.lock().take_ids(ids);
        if tasks.is_empty() {
            return;
        }
        self.load_batch(tasks).await;
    }

    /// Raw per-phase counts, independent of smoothing: (loaded, total)
    pub fn phase_progress(&self, phase: LoadingPhase) -> (usize, usize) {
        let registry = self.registry.lock();
        let loaded = self.loaded.lock();
        (
            registry.loaded_in_phase(phase, &loaded),
            registry.member_count(phase),
        )
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.loaded.lock().contains(id)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.registry.lock().contains(id)
    }

    pub fn pending_count(&self) -> usize {
        self.registry.lock().pending_count()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.lock().len()
    }

    /// The session's in-flight ceiling
    pub fn max_concurrent(&self) -> usize {
        self.config.max_concurrent.max(1)
    }

    /// Pending tasks carrying spatial metadata, for prefetch evaluation
    pub fn spatial_candidates(&self) -> Vec<SpatialCandidate> {
        self.registry.lock().spatial_candidates()
    }

    /// Record an id under a phase's totals without loading it yet
    pub(crate) fn track_member(&self, phase: LoadingPhase, id: &str) {
        self.registry.lock().note_member(phase, id);
        self.report_phase_progress(phase);
    }

    /// Clear the registry and loaded-set; in-flight operations run to
    /// completion but report into the fresh state
    pub fn reset(&self) {
        self.registry.lock().clear();
        self.loaded.lock().clear();
    }

    fn finish_task(&self, id: &str, phase: LoadingPhase) {
        self.registry.lock().finish(id);
        self.loaded.lock().insert(id.to_string());
        self.report_phase_progress(phase);
    }

    fn report_phase_progress(&self, phase: LoadingPhase) {
        let (loaded, total) = self.phase_progress(phase);
        let pct = if total == 0 {
            100.0
        } else {
            loaded as f32 / total as f32 * 100.0
        };
        self.machine.update_phase_progress(phase, pct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhaseConfig;
    use crate::task::AssetKind;

    fn test_loader(max_concurrent: usize) -> AssetLoader {
        let machine = PhaseMachine::new(PhaseConfig::zero_dwell());
        let config = LoaderConfig {
            max_concurrent,
            poll_attempts: 2,
            poll_interval: std::time::Duration::from_millis(10),
        };
        AssetLoader::new(machine, config)
    }

    fn noop_task(id: &str) -> AssetLoadTask {
        AssetLoadTask::new(id, AssetKind::Model, || async { anyhow::Ok(()) })
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_asset_is_idempotent() {
        let loader = test_loader(4);
        for _ in 0..5 {
            loader.add_asset(noop_task("statue").critical());
        }
        assert_eq!(loader.pending_count(), 1);
        assert_eq!(loader.phase_progress(LoadingPhase::Critical), (0, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_registering_a_loaded_id_is_a_noop() {
        let loader = test_loader(4);
        loader.mark_asset_loaded("statue", Some(LoadingPhase::Critical));
        loader.add_asset(noop_task("statue").critical());
        assert_eq!(loader.pending_count(), 0);
        assert_eq!(loader.phase_progress(LoadingPhase::Critical), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_asset_loaded_is_idempotent() {
        let loader = test_loader(4);
        loader.mark_asset_loaded("hud_icon", None);
        loader.mark_asset_loaded("hud_icon", None);
        assert_eq!(loader.loaded_count(), 1);
        assert_eq!(loader.phase_progress(LoadingPhase::Important), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_state() {
        let loader = test_loader(4);
        loader.add_asset(noop_task("a"));
        loader.mark_asset_loaded("b", None);
        loader.reset();
        assert_eq!(loader.pending_count(), 0);
        assert_eq!(loader.loaded_count(), 0);
        assert_eq!(loader.phase_progress(LoadingPhase::Important), (0, 0));
    }
}
