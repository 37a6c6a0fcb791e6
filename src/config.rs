//! Constructor-injected configuration for the loading core
//!
//! Every component takes its config explicitly; there are no global
//! singletons. Defaults match a desktop client on a typical connection.

use std::time::Duration;

use crate::phase::LoadingPhase;

/// Coarse device capability class, chosen once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

/// Coarse connection quality class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionClass {
    Slow,
    Typical,
    Fast,
}

/// Tuning for the phase state machine
#[derive(Debug, Clone)]
pub struct PhaseConfig {
    /// Interval between smoothing ticks
    pub tick_interval: Duration,
    /// Remaining gap below which displayed progress snaps to its target
    pub snap_epsilon: f32,
    /// Gap size above which the wide step fraction applies
    pub wide_gap: f32,
    /// Fraction of the remaining gap covered per tick on wide gaps
    pub wide_step: f32,
    /// Fraction of the remaining gap covered per tick near the target
    pub near_step: f32,
    /// Minimum time each loading phase stays visible, indexed
    /// critical/important/background
    pub min_phase_duration: [Duration; 3],
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(16),
            snap_epsilon: 0.25,
            wide_gap: 25.0,
            wide_step: 0.28,
            near_step: 0.12,
            min_phase_duration: [
                Duration::from_millis(800),
                Duration::from_millis(600),
                Duration::from_millis(400),
            ],
        }
    }
}

impl PhaseConfig {
    /// Config with no minimum dwell time, for tests and headless sessions
    pub fn zero_dwell() -> Self {
        Self {
            min_phase_duration: [Duration::ZERO; 3],
            ..Self::default()
        }
    }

    /// Minimum dwell for a phase; `Complete` has none
    pub fn min_duration(&self, phase: LoadingPhase) -> Duration {
        match phase.index() {
            Some(i) => self.min_phase_duration[i],
            None => Duration::ZERO,
        }
    }
}

/// Tuning for the concurrency-gated loader
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Maximum simultaneously in-flight load operations
    pub max_concurrent: usize,
    /// How many times `load_phase` polls for tasks before declaring the
    /// phase vacuously satisfied
    pub poll_attempts: u32,
    /// Delay between those polls
    pub poll_interval: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::for_device(DeviceClass::Desktop, ConnectionClass::Typical)
    }
}

impl LoaderConfig {
    /// Pick a concurrency budget from the device capability heuristic
    ///
    /// The budget is chosen once and held constant for the session; it caps
    /// simultaneous outstanding requests, not CPU work.
    pub fn for_device(device: DeviceClass, connection: ConnectionClass) -> Self {
        let max_concurrent = match (device, connection) {
            (DeviceClass::Mobile, ConnectionClass::Slow) => 2,
            (DeviceClass::Mobile, ConnectionClass::Typical) => 3,
            (DeviceClass::Mobile, ConnectionClass::Fast) => 4,
            (DeviceClass::Desktop, ConnectionClass::Slow) => 4,
            (DeviceClass::Desktop, ConnectionClass::Typical) => 6,
            (DeviceClass::Desktop, ConnectionClass::Fast) => 8,
        };
        Self {
            max_concurrent,
            poll_attempts: 10,
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Tuning for the idle-time background queue
#[derive(Debug, Clone)]
pub struct IdleConfig {
    /// Spacing between idle slices; doubles as the timeout fallback on
    /// idle-starved hosts
    pub idle_interval: Duration,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_millis(50),
        }
    }
}

/// Tuning for the predictive prefetcher
#[derive(Debug, Clone)]
pub struct PrefetchConfig {
    /// Minimum displacement from the last evaluated position before a new
    /// prefetch evaluation runs
    pub movement_threshold: f32,
    /// How far ahead, in seconds, player movement is extrapolated
    pub prediction_horizon: f32,
    /// Promotion radius for tasks that don't carry their own
    pub default_load_radius: f32,
    /// Tasks promoted per paced batch
    pub batch_size: usize,
    /// Delay between paced batches
    pub batch_delay: Duration,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            movement_threshold: 5.0,
            prediction_horizon: 2.0,
            default_load_radius: 50.0,
            batch_size: 4,
            batch_delay: Duration::from_millis(100),
        }
    }
}

/// Bundled configuration for a full [`LoadingContext`](crate::LoadingContext)
#[derive(Debug, Clone, Default)]
pub struct LoadingConfig {
    pub phase: PhaseConfig,
    pub loader: LoaderConfig,
    pub idle: IdleConfig,
    pub prefetch: PrefetchConfig,
}

impl LoadingConfig {
    /// Defaults with the loader budget picked for the given device class
    pub fn for_device(device: DeviceClass, connection: ConnectionClass) -> Self {
        Self {
            loader: LoaderConfig::for_device(device, connection),
            ..Self::default()
        }
    }
}
