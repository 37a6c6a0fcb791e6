//! Phase state machine with smoothed progress and dwell-gated transitions
//!
//! Owns the authoritative phase and the displayed progress value, independent
//! of how bursty the underlying load completions are. Raw completion counts
//! are a step function; the smoothing ticker turns them into a monotonically
//! increasing, perceptually continuous value for the UI.
//!
//! All timing runs on `tokio::time`, so paused-clock tests are deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use tokio::time::{sleep, Instant};

use crate::config::PhaseConfig;

use super::{LoadingPhase, PhaseStatus, BACKGROUND_WEIGHT, CRITICAL_WEIGHT, IMPORTANT_WEIGHT};

type StatusCallback = Arc<dyn Fn(PhaseStatus) + Send + Sync>;
type CompletionCallback = Arc<dyn Fn() + Send + Sync>;

struct MachineState {
    phase: LoadingPhase,
    /// Raw per-phase targets pushed by the loader, indexed by phase
    targets: [f32; 3],
    /// Smoothed values the UI sees; only ever move toward targets, never back
    displayed: [f32; 3],
    phase_started: Instant,
    ticker_running: bool,
    /// A transition for the current phase is already underway or timer-armed
    transition_pending: bool,
    subscribers: Vec<StatusCallback>,
    completion_callbacks: Vec<(LoadingPhase, CompletionCallback)>,
}

impl MachineState {
    fn fresh() -> Self {
        Self {
            phase: LoadingPhase::Critical,
            targets: [0.0; 3],
            displayed: [0.0; 3],
            phase_started: Instant::now(),
            ticker_running: false,
            transition_pending: false,
            subscribers: Vec::new(),
            completion_callbacks: Vec::new(),
        }
    }

    fn status(&self) -> PhaseStatus {
        let overall = ((self.displayed[0] * CRITICAL_WEIGHT
            + self.displayed[1] * IMPORTANT_WEIGHT
            + self.displayed[2] * BACKGROUND_WEIGHT)
            / 100.0)
            .clamp(0.0, 100.0);
        let progress = match self.phase.index() {
            Some(i) => self.displayed[i],
            None => 100.0,
        };
        PhaseStatus {
            phase: self.phase,
            progress,
            overall_progress: overall,
            is_complete: self.phase == LoadingPhase::Complete,
        }
    }
}

/// Tracks the active loading phase and smooths displayed progress
///
/// Cheaply cloneable handle; clones share state. Spawns its smoothing ticker
/// and dwell timers on the ambient tokio runtime, so it must be used from
/// within one.
#[derive(Clone)]
pub struct PhaseMachine {
    state: Arc<Mutex<MachineState>>,
    /// Bumped on reset to invalidate in-flight tickers and dwell timers
    epoch: Arc<AtomicU64>,
    config: Arc<PhaseConfig>,
}

impl PhaseMachine {
    pub fn new(config: PhaseConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(MachineState::fresh())),
            epoch: Arc::new(AtomicU64::new(0)),
            config: Arc::new(config),
        }
    }

    /// Record a new target for a phase, clamped to [0, 100]
    ///
    /// Targets are monotonic within a session: a value at or below the
    /// previously recorded target (a late registration grew the denominator)
    /// is ignored, so the world-entry gate and armed dwell timers never
    /// regress. Does not directly mutate displayed progress; the smoothing
    /// ticker approaches the target over subsequent ticks.
    pub fn update_phase_progress(&self, phase: LoadingPhase, target: f32) {
        let Some(i) = phase.index() else { return };
        {
            let mut state = self.state.lock();
            let target = target.clamp(0.0, 100.0);
            if target <= state.targets[i] {
                return;
            }
            state.targets[i] = target;
        }
        self.ensure_ticker();
        self.maybe_schedule_transition();
    }

    /// Current phase, smoothed phase progress, and weighted overall progress
    pub fn status(&self) -> PhaseStatus {
        self.state.lock().status()
    }

    pub fn current_phase(&self) -> LoadingPhase {
        self.state.lock().phase
    }

    /// Raw target for a phase (always 100 for `Complete`)
    pub fn target(&self, phase: LoadingPhase) -> f32 {
        match phase.index() {
            Some(i) => self.state.lock().targets[i],
            None => 100.0,
        }
    }

    /// Smoothed displayed value for a phase
    pub fn displayed_progress(&self, phase: LoadingPhase) -> f32 {
        match phase.index() {
            Some(i) => self.state.lock().displayed[i],
            None => 100.0,
        }
    }

    /// True once the critical phase target has reached 100
    ///
    /// Decoupled from dwell timers and smoothing: the world can become
    /// playable while the loading screen is still animating out.
    pub fn can_enter_world(&self) -> bool {
        let state = self.state.lock();
        state.phase > LoadingPhase::Critical || state.targets[0] >= 100.0
    }

    /// Register a status observer; invoked immediately with current state,
    /// then on every smoothing tick and transition
    pub fn subscribe(&self, callback: impl Fn(PhaseStatus) + Send + Sync + 'static) {
        let (status, callback) = {
            let mut state = self.state.lock();
            let cb: StatusCallback = Arc::new(callback);
            state.subscribers.push(Arc::clone(&cb));
            (state.status(), cb)
        };
        callback(status);
    }

    /// Register a one-shot callback fired when `phase` finishes its visible
    /// transition; fired immediately if the machine is already past it
    pub fn on_phase_complete(&self, phase: LoadingPhase, callback: impl Fn() + Send + Sync + 'static) {
        let already_past = {
            let mut state = self.state.lock();
            if state.phase > phase {
                true
            } else {
                state.completion_callbacks.push((phase, Arc::new(callback)));
                return;
            }
        };
        if already_past {
            callback();
        }
    }

    /// Advance to the next phase; no-op once `Complete`
    ///
    /// Subscriber notification and phase-complete callbacks run synchronously
    /// within this call, so transitions are serialized.
    pub fn transition_to_next_phase(&self) {
        let (status, subscribers, fired, old) = {
            let mut state = self.state.lock();
            if state.phase == LoadingPhase::Complete {
                return;
            }
            let old = state.phase;
            state.phase = old.next();
            state.phase_started = Instant::now();
            state.transition_pending = false;
            let mut fired = Vec::new();
            state.completion_callbacks.retain(|(p, cb)| {
                if *p == old {
                    fired.push(Arc::clone(cb));
                    false
                } else {
                    true
                }
            });
            (state.status(), state.subscribers.clone(), fired, old)
        };
        debug!("{old} phase done, advancing to {}", status.phase);
        for subscriber in &subscribers {
            subscriber(status);
        }
        for callback in &fired {
            callback();
        }
        // The next phase may already be at 100 (vacuous or pre-drained)
        self.maybe_schedule_transition();
    }

    /// Back to `Critical` with zeroed progress; cancels tickers and timers
    ///
    /// Observer registrations survive a reset so UI wired before a new
    /// session keeps receiving status.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let (status, subscribers) = {
            let mut state = self.state.lock();
            let subscribers = std::mem::take(&mut state.subscribers);
            let callbacks = std::mem::take(&mut state.completion_callbacks);
            *state = MachineState::fresh();
            state.subscribers = subscribers;
            state.completion_callbacks = callbacks;
            (state.status(), state.subscribers.clone())
        };
        for subscriber in &subscribers {
            subscriber(status);
        }
    }

    /// Lazily start the smoothing ticker if any displayed value lags its target
    fn ensure_ticker(&self) {
        {
            let mut state = self.state.lock();
            if state.ticker_running {
                return;
            }
            let lagging = (0..3).any(|i| state.targets[i] - state.displayed[i] > 0.0);
            if !lagging {
                return;
            }
            state.ticker_running = true;
        }
        let machine = self.clone();
        let epoch = self.epoch.load(Ordering::SeqCst);
        tokio::spawn(async move {
            machine.run_ticker(epoch).await;
        });
    }

    /// Move each displayed value a fraction of its remaining gap per tick
    ///
    /// A wide gap takes a larger fractional step so big jumps don't visibly
    /// stall; close in, the step shrinks to avoid overshoot jitter. The loop
    /// terminates once every gap has snapped closed.
    async fn run_ticker(self, epoch: u64) {
        loop {
            sleep(self.config.tick_interval).await;
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            let (status, subscribers, finished) = {
                let mut state = self.state.lock();
                for i in 0..3 {
                    let gap = state.targets[i] - state.displayed[i];
                    if gap <= 0.0 {
                        continue;
                    }
                    if gap <= self.config.snap_epsilon {
                        state.displayed[i] = state.targets[i];
                    } else {
                        let step = if gap > self.config.wide_gap {
                            self.config.wide_step
                        } else {
                            self.config.near_step
                        };
                        state.displayed[i] += gap * step;
                    }
                }
                let finished = (0..3).all(|i| state.targets[i] - state.displayed[i] <= 0.0);
                if finished {
                    state.ticker_running = false;
                }
                (state.status(), state.subscribers.clone(), finished)
            };
            for subscriber in &subscribers {
                subscriber(status);
            }
            if finished {
                return;
            }
        }
    }

    /// Transition out of the current phase once its target hits 100 and the
    /// minimum dwell has elapsed; otherwise arm a timer for the remainder
    fn maybe_schedule_transition(&self) {
        let deferred = {
            let mut state = self.state.lock();
            let Some(i) = state.phase.index() else { return };
            if state.targets[i] < 100.0 || state.transition_pending {
                return;
            }
            state.transition_pending = true;
            let min = self.config.min_duration(state.phase);
            let elapsed = state.phase_started.elapsed();
            if elapsed >= min {
                None
            } else {
                Some((state.phase, min - elapsed))
            }
        };
        match deferred {
            None => self.transition_to_next_phase(),
            Some((armed_phase, remaining)) => {
                let machine = self.clone();
                let epoch = self.epoch.load(Ordering::SeqCst);
                tokio::spawn(async move {
                    sleep(remaining).await;
                    if machine.epoch.load(Ordering::SeqCst) != epoch {
                        return;
                    }
                    // Re-validate: still the same phase, target still 100
                    let ready = {
                        let mut state = machine.state.lock();
                        state.transition_pending = false;
                        state.phase == armed_phase
                            && armed_phase
                                .index()
                                .is_some_and(|i| state.targets[i] >= 100.0)
                    };
                    if ready {
                        machine.transition_to_next_phase();
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn zero_dwell_machine() -> PhaseMachine {
        PhaseMachine::new(PhaseConfig::zero_dwell())
    }

    #[tokio::test(start_paused = true)]
    async fn test_targets_are_clamped() {
        let machine = zero_dwell_machine();
        machine.update_phase_progress(LoadingPhase::Critical, 250.0);
        assert_eq!(machine.target(LoadingPhase::Critical), 100.0);
        machine.reset();
        machine.update_phase_progress(LoadingPhase::Critical, -10.0);
        assert_eq!(machine.target(LoadingPhase::Critical), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_targets_never_regress() {
        let machine = zero_dwell_machine();
        machine.update_phase_progress(LoadingPhase::Important, 80.0);
        machine.update_phase_progress(LoadingPhase::Important, 60.0);
        assert_eq!(machine.target(LoadingPhase::Important), 80.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_fires_immediately() {
        let machine = zero_dwell_machine();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        machine.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transition_is_forward_only() {
        let machine = zero_dwell_machine();
        machine.transition_to_next_phase();
        machine.transition_to_next_phase();
        machine.transition_to_next_phase();
        assert_eq!(machine.current_phase(), LoadingPhase::Complete);
        // Terminal: further transitions are no-ops
        machine.transition_to_next_phase();
        assert_eq!(machine.current_phase(), LoadingPhase::Complete);
        assert!(machine.status().is_complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_phase_complete_callback_fires_once() {
        let machine = zero_dwell_machine();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        machine.on_phase_complete(LoadingPhase::Critical, move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        machine.update_phase_progress(LoadingPhase::Critical, 100.0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(machine.current_phase(), LoadingPhase::Important);
    }

    #[tokio::test(start_paused = true)]
    async fn test_phase_complete_callback_for_past_phase() {
        let machine = zero_dwell_machine();
        machine.update_phase_progress(LoadingPhase::Critical, 100.0);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        machine.on_phase_complete(LoadingPhase::Critical, move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_returns_to_critical() {
        let machine = zero_dwell_machine();
        machine.update_phase_progress(LoadingPhase::Critical, 100.0);
        assert_eq!(machine.current_phase(), LoadingPhase::Important);
        machine.reset();
        assert_eq!(machine.current_phase(), LoadingPhase::Critical);
        assert_eq!(machine.target(LoadingPhase::Critical), 0.0);
        assert!(!machine.can_enter_world());
    }
}
