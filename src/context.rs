//! Application context wiring the loading core together
//!
//! One explicit object graph instead of module-level singletons: the phase
//! machine, loader, idle queue, and prefetcher are constructed together from
//! injected configuration and share one lifecycle.

use crate::config::LoadingConfig;
use crate::idle::IdleBackgroundQueue;
use crate::loader::AssetLoader;
use crate::phase::PhaseMachine;
use crate::spatial::Prefetcher;

/// A complete progressive-loading session
///
/// Created once per client session; `reset()` starts a new game session
/// without rebuilding the graph.
pub struct LoadingContext {
    machine: PhaseMachine,
    loader: AssetLoader,
    idle: IdleBackgroundQueue,
    prefetcher: Prefetcher,
}

impl LoadingContext {
    pub fn new(config: LoadingConfig) -> Self {
        let machine = PhaseMachine::new(config.phase);
        let loader = AssetLoader::new(machine.clone(), config.loader);
        let idle = IdleBackgroundQueue::new(loader.clone(), config.idle);
        let prefetcher = Prefetcher::new(loader.clone(), config.prefetch);
        Self {
            machine,
            loader,
            idle,
            prefetcher,
        }
    }

    pub fn phases(&self) -> &PhaseMachine {
        &self.machine
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    pub fn idle_queue(&self) -> &IdleBackgroundQueue {
        &self.idle
    }

    pub fn prefetcher(&self) -> &Prefetcher {
        &self.prefetcher
    }

    /// Clear all registries, queues, timers, and the loaded-set
    ///
    /// In-flight load operations are not cancelled; they run to completion
    /// and report into the fresh state. Pending idle slices, dwell timers,
    /// and smoothing tickers are cancelled wholesale.
    pub fn reset(&self) {
        self.idle.clear();
        self.prefetcher.reset();
        self.loader.reset();
        self.machine.reset();
    }
}

impl Default for LoadingContext {
    fn default() -> Self {
        Self::new(LoadingConfig::default())
    }
}
