//! Deduplicated pending-task registry
//!
//! Folded into the loader: holds not-yet-started tasks in scheduling order
//! (critical first, then descending priority) and the monotonic per-phase
//! membership sets the progress denominators are computed from.

use std::collections::{HashMap, HashSet};

use glam::Vec3;

use crate::phase::LoadingPhase;
use crate::task::AssetLoadTask;

/// Spatial metadata for a pending task, consumed by the prefetcher
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialCandidate {
    pub id: String,
    pub position: Vec3,
    pub load_radius: Option<f32>,
    pub priority: i32,
}

#[derive(Default)]
pub(crate) struct Registry {
    /// Pending tasks in start order
    pending: Vec<AssetLoadTask>,
    /// Ids handed to the loader but not finished yet; blocks re-registration
    /// while the load operation is still running
    in_flight: HashSet<String>,
    /// Every id ever registered under each phase; membership never shrinks
    /// within a session, so denominators stay stable as tasks drain
    members: HashMap<LoadingPhase, HashSet<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the id is already pending or in flight; returns false
    /// on duplicates
    pub fn insert(&mut self, task: AssetLoadTask) -> bool {
        if self.in_flight.contains(&task.id) || self.pending.iter().any(|t| t.id == task.id) {
            return false;
        }
        self.note_member(task.resolved_phase(), &task.id);
        self.pending.push(task);
        self.pending
            .sort_by(|a, b| b.critical.cmp(&a.critical).then(b.priority.cmp(&a.priority)));
        true
    }

    /// Record an id under a phase without a pending task (external loads)
    pub fn note_member(&mut self, phase: LoadingPhase, id: &str) {
        self.members.entry(phase).or_default().insert(id.to_string());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pending.iter().any(|t| t.id == id)
    }

    /// Remove and return a single pending task by id
    pub fn remove(&mut self, id: &str) -> Option<AssetLoadTask> {
        let index = self.pending.iter().position(|t| t.id == id)?;
        Some(self.pending.remove(index))
    }

    /// Drain all pending tasks for a phase, preserving start order
    ///
    /// Taken ids stay tracked as in-flight until `finish` is called for them.
    pub fn take_phase(&mut self, phase: LoadingPhase) -> Vec<AssetLoadTask> {
        let mut taken = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].resolved_phase() == phase {
                taken.push(self.pending.remove(i));
            } else {
                i += 1;
            }
        }
        for task in &taken {
            self.in_flight.insert(task.id.clone());
        }
        taken
    }

    /// Drain the named pending tasks, preserving start order
    ///
    /// Taken ids stay tracked as in-flight until `finish` is called for them.
    pub fn take_ids(&mut self, ids: &[String]) -> Vec<AssetLoadTask> {
        let mut taken = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if ids.iter().any(|id| *id == self.pending[i].id) {
                taken.push(self.pending.remove(i));
            } else {
                i += 1;
            }
        }
        for task in &taken {
            self.in_flight.insert(task.id.clone());
        }
        taken
    }

    /// Release an id from in-flight tracking once its load settles
    pub fn finish(&mut self, id: &str) {
        self.in_flight.remove(id);
    }

    /// Total ids ever registered under a phase
    pub fn member_count(&self, phase: LoadingPhase) -> usize {
        self.members.get(&phase).map_or(0, HashSet::len)
    }

    /// How many of a phase's members appear in the loaded-set
    pub fn loaded_in_phase(&self, phase: LoadingPhase, loaded: &HashSet<String>) -> usize {
        self.members
            .get(&phase)
            .map_or(0, |m| m.iter().filter(|id| loaded.contains(*id)).count())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Pending tasks that carry a world position
    pub fn spatial_candidates(&self) -> Vec<SpatialCandidate> {
        self.pending
            .iter()
            .filter_map(|t| {
                t.world_position.map(|position| SpatialCandidate {
                    id: t.id.clone(),
                    position,
                    load_radius: t.load_radius,
                    priority: t.priority,
                })
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.in_flight.clear();
        self.members.clear();
    }
}
