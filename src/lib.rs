//! loadphase - Progressive asset loading with phase orchestration
//!
//! # Features
//! - Four-phase loading state machine (critical, important, background,
//!   complete) with smoothed progress and dwell-gated transitions
//! - Concurrency-gated loader with priority ordering and fail-soft semantics
//! - Idle-time background queue for cosmetic assets
//! - Predictive spatial prefetching from player position and velocity
//! - Explicit application context, no global singletons
//!
//! # Quick Start
//!
//! ```ignore
//! use loadphase::{AssetKind, AssetLoadTask, LoadingContext, LoadingPhase};
//!
//! let ctx = LoadingContext::default();
//! ctx.loader().add_asset(
//!     AssetLoadTask::new("player_model", AssetKind::Model, || async {
//!         // fetch and decode the asset here
//!         anyhow::Ok(())
//!     })
//!     .critical(),
//! );
//! ctx.loader().load_phase(LoadingPhase::Critical).await;
//! assert!(ctx.phases().can_enter_world());
//! ```
//!
//! The machine, loader, idle queue, and prefetcher spawn their timers and
//! workers on the ambient tokio runtime; construct the context from within
//! one.

// Core modules
pub mod config;
pub mod context;
pub mod idle;
pub mod loader;
pub mod phase;
pub mod spatial;
pub mod task;

// Error types
mod error;
pub use error::{LoadError, Result};

// Re-export the main types
pub use config::{
    ConnectionClass, DeviceClass, IdleConfig, LoaderConfig, LoadingConfig, PhaseConfig,
    PrefetchConfig,
};
pub use context::LoadingContext;
pub use idle::IdleBackgroundQueue;
pub use loader::{AssetLoader, SpatialCandidate};
pub use phase::{LoadingPhase, PhaseMachine, PhaseStatus};
pub use spatial::{predict_position, PrefetchZone, Prefetcher};
pub use task::{AssetKind, AssetLoadTask, LoadOperation};
