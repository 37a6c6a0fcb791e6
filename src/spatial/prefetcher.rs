//! Predictive prefetcher
//!
//! Observes player position and velocity, extrapolates a future position,
//! and promotes nearby not-yet-loaded tasks into the loader ahead of need.
//! Promotions run in small paced batches so a single movement event cannot
//! flood the loader.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::Vec3;
use log::debug;
use parking_lot::Mutex;
use tokio::time::sleep;

use crate::config::PrefetchConfig;
use crate::loader::AssetLoader;

use super::{predict_position, PrefetchZone};

/// Dead-reckoning prefetcher feeding the concurrency-gated loader
///
/// Cheaply cloneable handle; clones share zone and queue state.
#[derive(Clone)]
pub struct Prefetcher {
    loader: AssetLoader,
    zones: Arc<Mutex<HashMap<String, PrefetchZone>>>,
    /// Last position an evaluation ran at; movement below the threshold
    /// since then is ignored
    last_evaluated: Arc<Mutex<Option<Vec3>>>,
    /// Ids selected for promotion that have not finished loading yet
    queued: Arc<Mutex<HashSet<String>>>,
    /// Bumped on reset to cancel in-flight pacing loops
    epoch: Arc<AtomicU64>,
    config: Arc<PrefetchConfig>,
}

impl Prefetcher {
    pub fn new(loader: AssetLoader, config: PrefetchConfig) -> Self {
        Self {
            loader,
            zones: Arc::new(Mutex::new(HashMap::new())),
            last_evaluated: Arc::new(Mutex::new(None)),
            queued: Arc::new(Mutex::new(HashSet::new())),
            epoch: Arc::new(AtomicU64::new(0)),
            config: Arc::new(config),
        }
    }

    /// Feed the latest player position; evaluates prefetch on the first
    /// update and whenever displacement exceeds the movement threshold
    pub fn update_player_position(&self, position: Vec3, velocity: Option<Vec3>) {
        {
            let mut last = self.last_evaluated.lock();
            if let Some(prev) = *last {
                if prev.distance(position) < self.config.movement_threshold {
                    return;
                }
            }
            *last = Some(position);
        }
        let predicted = predict_position(position, velocity, self.config.prediction_horizon);
        self.evaluate(predicted);
    }

    /// Declare an area that matters; re-registering an id is a no-op
    pub fn register_zone(&self, zone: PrefetchZone) {
        self.zones.lock().entry(zone.id.clone()).or_insert(zone);
    }

    /// Remove a zone; unknown ids are a silent no-op
    pub fn unregister_zone(&self, id: &str) {
        self.zones.lock().remove(id);
    }

    pub fn zone_count(&self) -> usize {
        self.zones.lock().len()
    }

    /// Whether an id is currently selected for promotion
    pub fn is_queued(&self, id: &str) -> bool {
        self.queued.lock().contains(id)
    }

    /// Clear zones, queued selections, and position history; pacing loops
    /// still in flight are cancelled before their next batch
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.zones.lock().clear();
        self.queued.lock().clear();
        *self.last_evaluated.lock() = None;
    }

    /// Select pending spatial tasks near the predicted position and promote
    /// them in paced batches
    fn evaluate(&self, predicted: Vec3) {
        let candidates = self.loader.spatial_candidates();
        if candidates.is_empty() {
            return;
        }
        let zones: Vec<PrefetchZone> = self
            .zones
            .lock()
            .values()
            .filter(|zone| zone.contains(predicted))
            .cloned()
            .collect();

        // id -> effective priority (zone boost applied)
        let mut selected: HashMap<String, i32> = HashMap::new();
        {
            let queued = self.queued.lock();
            for candidate in &candidates {
                if queued.contains(&candidate.id) || self.loader.is_loaded(&candidate.id) {
                    continue;
                }
                let radius = candidate
                    .load_radius
                    .unwrap_or(self.config.default_load_radius);
                if candidate.position.distance(predicted) <= radius {
                    selected.insert(candidate.id.clone(), candidate.priority);
                }
                for zone in &zones {
                    if zone.contains(candidate.position) {
                        let boosted = candidate.priority + zone.priority;
                        selected
                            .entry(candidate.id.clone())
                            .and_modify(|p| *p = (*p).max(boosted))
                            .or_insert(boosted);
                    }
                }
            }
        }
        if selected.is_empty() {
            return;
        }

        let mut ordered: Vec<(String, i32)> = selected.into_iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1));
        let ids: Vec<String> = ordered.into_iter().map(|(id, _)| id).collect();
        {
            let mut queued = self.queued.lock();
            for id in &ids {
                queued.insert(id.clone());
            }
        }
        debug!("prefetch promoting {} assets near {predicted}", ids.len());

        let this = self.clone();
        let epoch = self.epoch.load(Ordering::SeqCst);
        tokio::spawn(async move {
            let batch_size = this.config.batch_size.max(1);
            let mut first = true;
            for batch in ids.chunks(batch_size) {
                if !first {
                    sleep(this.config.batch_delay).await;
                }
                first = false;
                if this.epoch.load(Ordering::SeqCst) != epoch {
                    return;
                }
                this.loader.promote(batch).await;
                let mut queued = this.queued.lock();
                for id in batch {
                    queued.remove(id);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoaderConfig, PhaseConfig};
    use crate::phase::PhaseMachine;

    fn test_prefetcher() -> Prefetcher {
        let machine = PhaseMachine::new(PhaseConfig::zero_dwell());
        let loader = AssetLoader::new(machine, LoaderConfig::default());
        Prefetcher::new(loader, PrefetchConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_zone_registration_is_idempotent() {
        let prefetcher = test_prefetcher();
        let zone = PrefetchZone::new("harbor", Vec3::ZERO, 50.0, 3);
        prefetcher.register_zone(zone.clone());
        prefetcher.register_zone(zone);
        assert_eq!(prefetcher.zone_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregister_unknown_zone_is_noop() {
        let prefetcher = test_prefetcher();
        prefetcher.unregister_zone("nowhere");
        assert_eq!(prefetcher.zone_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_zones_and_history() {
        let prefetcher = test_prefetcher();
        prefetcher.register_zone(PrefetchZone::new("harbor", Vec3::ZERO, 50.0, 3));
        prefetcher.update_player_position(Vec3::ZERO, None);
        prefetcher.reset();
        assert_eq!(prefetcher.zone_count(), 0);
    }
}
