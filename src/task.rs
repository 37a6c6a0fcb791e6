//! Asset load task descriptors
//!
//! A task is a uniquely-identified unit of asset work. The core never
//! inspects asset content; each task carries its own opaque async load
//! operation, plus the priority, criticality, and optional spatial metadata
//! the scheduler orders it by.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use glam::Vec3;

use crate::phase::LoadingPhase;

/// Type-erased asynchronous load operation supplied by the task's producer
///
/// Resolution and rejection are interpreted by the loader's fail-soft policy;
/// a rejected operation is logged and the task is marked loaded regardless.
pub type LoadOperation = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Category of asset a task loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Texture,
    Model,
    Sound,
    Icon,
}

/// A schedulable unit of asset work
///
/// Identity is the `id`; registering a duplicate id is a no-op. The phase is
/// optional at construction and resolved at registration: critical-flagged
/// tasks default to the critical phase, everything else to important.
#[derive(Clone)]
pub struct AssetLoadTask {
    pub id: String,
    pub kind: AssetKind,
    pub load: LoadOperation,
    pub priority: i32,
    pub critical: bool,
    pub phase: Option<LoadingPhase>,
    pub world_position: Option<Vec3>,
    pub load_radius: Option<f32>,
}

impl AssetLoadTask {
    /// Create a task from an async load operation
    pub fn new<F, Fut>(id: impl Into<String>, kind: AssetKind, load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            id: id.into(),
            kind,
            load: Arc::new(move || -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(load())
            }),
            priority: 0,
            critical: false,
            phase: None,
            world_position: None,
            load_radius: None,
        }
    }

    /// Set the scheduling priority (higher loads first within a phase)
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Flag the task as critical (sorts first, defaults to the critical phase)
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Pin the task to an explicit phase
    pub fn in_phase(mut self, phase: LoadingPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attach a world position for predictive prefetching
    pub fn at_position(mut self, position: Vec3) -> Self {
        self.world_position = Some(position);
        self
    }

    /// Override the radius within which the prefetcher promotes this task
    pub fn with_load_radius(mut self, radius: f32) -> Self {
        self.load_radius = Some(radius.max(0.0));
        self
    }

    /// The phase this task loads in, applying the criticality default
    pub fn resolved_phase(&self) -> LoadingPhase {
        self.phase.unwrap_or(if self.critical {
            LoadingPhase::Critical
        } else {
            LoadingPhase::Important
        })
    }
}

impl fmt::Debug for AssetLoadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetLoadTask")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("critical", &self.critical)
            .field("phase", &self.phase)
            .field("world_position", &self.world_position)
            .field("load_radius", &self.load_radius)
            .finish_non_exhaustive()
    }
}
