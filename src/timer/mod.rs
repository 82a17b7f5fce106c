//! Pomodoro timer: 25 minute work phases, 5 minute breaks.

mod state;

pub use state::{
    PhaseComplete, PomodoroPhase, PomodoroState, PomodoroStatus, BREAK_DURATION, WORK_DURATION,
};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::info;

/// Shared handle over [`PomodoroState`] using the wall clock.
///
/// Phase completion is checked lazily: every call settles an expired phase first.
#[derive(Clone, Default)]
pub struct PomodoroTimer {
    state: Arc<Mutex<PomodoroState>>,
}

impl PomodoroTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PomodoroState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn settle(state: &mut PomodoroState, now: Instant) {
        if let Some(event) = state.tick(now) {
            info!(
                "Pomodoro {:?} phase complete, {:?} is next (paused)",
                event.finished, event.next
            );
        }
    }

    pub fn start(&self) -> PomodoroStatus {
        let now = Instant::now();
        let mut state = self.lock();
        Self::settle(&mut state, now);
        state.start(now);
        state.status(now)
    }

    pub fn pause(&self) -> PomodoroStatus {
        let now = Instant::now();
        let mut state = self.lock();
        Self::settle(&mut state, now);
        state.pause(now);
        state.status(now)
    }

    pub fn reset(&self) -> PomodoroStatus {
        let now = Instant::now();
        let mut state = self.lock();
        state.reset();
        state.status(now)
    }

    /// Reports a phase that ran out since the last call.
    pub fn tick(&self, now: Instant) -> Option<PhaseComplete> {
        self.lock().tick(now)
    }

    pub fn remaining(&self) -> Duration {
        let now = Instant::now();
        let mut state = self.lock();
        Self::settle(&mut state, now);
        state.remaining(now)
    }

    pub fn status(&self) -> PomodoroStatus {
        let now = Instant::now();
        let mut state = self.lock();
        Self::settle(&mut state, now);
        state.status(now)
    }
}
