//! Loading phases and progress reporting
//!
//! Phases are strictly ordered and transitions only move forward. The
//! weighted overall progress is what external UI renders; the weights are a
//! design invariant (world entry gates on the critical phase alone, but the
//! reported number must reach exactly 100 only once background work is done).

pub mod machine;

pub use machine::PhaseMachine;

use std::fmt;

/// Weight of the critical phase in overall progress (out of 100)
pub const CRITICAL_WEIGHT: f32 = 50.0;
/// Weight of the important phase in overall progress (out of 100)
pub const IMPORTANT_WEIGHT: f32 = 35.0;
/// Weight of the background phase in overall progress (out of 100)
pub const BACKGROUND_WEIGHT: f32 = 15.0;

/// An ordered stage of loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoadingPhase {
    /// Assets required before the world becomes playable
    Critical,
    /// Assets that should arrive shortly after world entry
    Important,
    /// Cosmetic assets loaded opportunistically
    Background,
    /// All phases drained
    Complete,
}

impl LoadingPhase {
    /// The three phases that carry load work, in order
    pub const LOADING_PHASES: [LoadingPhase; 3] = [
        LoadingPhase::Critical,
        LoadingPhase::Important,
        LoadingPhase::Background,
    ];

    /// The next phase in sequence; `Complete` is terminal
    pub fn next(self) -> LoadingPhase {
        match self {
            LoadingPhase::Critical => LoadingPhase::Important,
            LoadingPhase::Important => LoadingPhase::Background,
            LoadingPhase::Background => LoadingPhase::Complete,
            LoadingPhase::Complete => LoadingPhase::Complete,
        }
    }

    /// Index into per-phase progress arrays; `None` for `Complete`
    pub fn index(self) -> Option<usize> {
        match self {
            LoadingPhase::Critical => Some(0),
            LoadingPhase::Important => Some(1),
            LoadingPhase::Background => Some(2),
            LoadingPhase::Complete => None,
        }
    }

    /// Contribution of this phase to overall progress, out of 100
    pub fn weight(self) -> f32 {
        match self {
            LoadingPhase::Critical => CRITICAL_WEIGHT,
            LoadingPhase::Important => IMPORTANT_WEIGHT,
            LoadingPhase::Background => BACKGROUND_WEIGHT,
            LoadingPhase::Complete => 0.0,
        }
    }
}

impl fmt::Display for LoadingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadingPhase::Critical => "critical",
            LoadingPhase::Important => "important",
            LoadingPhase::Background => "background",
            LoadingPhase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Snapshot of loading progress delivered to subscribers
///
/// `progress` is the current phase's smoothed (displayed) value, not the raw
/// completion ratio; `overall_progress` is the weighted blend across phases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseStatus {
    pub phase: LoadingPhase,
    pub progress: f32,
    pub overall_progress: f32,
    pub is_complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        assert!(LoadingPhase::Critical < LoadingPhase::Important);
        assert!(LoadingPhase::Important < LoadingPhase::Background);
        assert!(LoadingPhase::Background < LoadingPhase::Complete);
    }

    #[test]
    fn test_phase_next_chain() {
        let mut phase = LoadingPhase::Critical;
        phase = phase.next();
        assert_eq!(phase, LoadingPhase::Important);
        phase = phase.next();
        assert_eq!(phase, LoadingPhase::Background);
        phase = phase.next();
        assert_eq!(phase, LoadingPhase::Complete);

        // Complete is terminal
        assert_eq!(phase.next(), LoadingPhase::Complete);
    }

    #[test]
    fn test_weights_sum_to_hundred() {
        let total: f32 = LoadingPhase::LOADING_PHASES
            .iter()
            .map(|p| p.weight())
            .sum();
        assert_eq!(total, 100.0);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(LoadingPhase::Critical.to_string(), "critical");
        assert_eq!(LoadingPhase::Complete.to_string(), "complete");
    }
}
