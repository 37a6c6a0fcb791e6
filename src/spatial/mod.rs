//! Spatial prediction primitives
//!
//! Position-based asset prediction: dead-reckon the player a short horizon
//! ahead and bias the loader toward what they are about to need. Naive
//! "load what's visible" strategies pop in during fast traversal; a short
//! extrapolation converts that into invisible just-in-time loads.

pub mod prefetcher;

pub use prefetcher::Prefetcher;

use glam::Vec3;

/// A declared spatial region that boosts priority of assets inside it
#[derive(Debug, Clone, PartialEq)]
pub struct PrefetchZone {
    pub id: String,
    pub center: Vec3,
    pub radius: f32,
    pub priority: i32,
}

impl PrefetchZone {
    pub fn new(id: impl Into<String>, center: Vec3, radius: f32, priority: i32) -> Self {
        Self {
            id: id.into(),
            center,
            radius: radius.max(0.0),
            priority,
        }
    }

    /// Whether a point falls inside the zone's catchment
    pub fn contains(&self, point: Vec3) -> bool {
        self.center.distance(point) <= self.radius
    }
}

/// Extrapolate a future position from current position and velocity
///
/// Without a velocity the prediction collapses to the current position.
pub fn predict_position(position: Vec3, velocity: Option<Vec3>, horizon_secs: f32) -> Vec3 {
    match velocity {
        Some(velocity) => position + velocity * horizon_secs,
        None => position,
    }
}
