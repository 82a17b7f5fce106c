use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const WORK_DURATION: Duration = Duration::from_secs(25 * 60);
pub const BREAK_DURATION: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PomodoroPhase {
    #[default]
    Work,
    Break,
}

impl PomodoroPhase {
    pub fn duration(&self) -> Duration {
        match self {
            PomodoroPhase::Work => WORK_DURATION,
            PomodoroPhase::Break => BREAK_DURATION,
        }
    }

    pub fn next(&self) -> PomodoroPhase {
        match self {
            PomodoroPhase::Work => PomodoroPhase::Break,
            PomodoroPhase::Break => PomodoroPhase::Work,
        }
    }
}

/// Emitted by [`PomodoroState::tick`] when a phase runs out.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseComplete {
    pub finished: PomodoroPhase,
    pub next: PomodoroPhase,
    pub completed_work_sessions: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroStatus {
    pub phase: PomodoroPhase,
    pub running: bool,
    pub remaining_secs: u64,
    /// `MM:SS`
    pub display: String,
    pub completed_work_sessions: u32,
}

/// Work/break state machine. Time is passed in so callers and tests control the clock.
#[derive(Debug, Clone, Default)]
pub struct PomodoroState {
    phase: PomodoroPhase,
    completed_work_sessions: u32,
    /// Elapsed time from earlier running windows of the current phase; combines with
    /// `running_anchor` to compute the true elapsed duration.
    elapsed_baseline: Duration,
    running_anchor: Option<Instant>,
}

impl PomodoroState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PomodoroPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running_anchor.is_some()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.running_anchor {
            Some(anchor) => self
                .elapsed_baseline
                .saturating_add(now.saturating_duration_since(anchor)),
            None => self.elapsed_baseline,
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.phase.duration().saturating_sub(self.elapsed(now))
    }

    /// No-op when already running.
    pub fn start(&mut self, now: Instant) {
        if self.running_anchor.is_none() {
            self.running_anchor = Some(now);
        }
    }

    pub fn pause(&mut self, now: Instant) {
        self.elapsed_baseline = self.elapsed(now);
        self.running_anchor = None;
    }

    /// Back to a fresh, paused work phase.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Flips to the next phase, paused, once the current one has run out.
    pub fn tick(&mut self, now: Instant) -> Option<PhaseComplete> {
        if !self.is_running() || !self.remaining(now).is_zero() {
            return None;
        }

        let finished = self.phase;
        if finished == PomodoroPhase::Work {
            self.completed_work_sessions += 1;
        }
        self.phase = finished.next();
        self.elapsed_baseline = Duration::ZERO;
        self.running_anchor = None;

        Some(PhaseComplete {
            finished,
            next: self.phase,
            completed_work_sessions: self.completed_work_sessions,
        })
    }

    pub fn status(&self, now: Instant) -> PomodoroStatus {
        let remaining_secs = self.remaining(now).as_secs();
        PomodoroStatus {
            phase: self.phase,
            running: self.is_running(),
            remaining_secs,
            display: format!("{:02}:{:02}", remaining_secs / 60, remaining_secs % 60),
            completed_work_sessions: self.completed_work_sessions,
        }
    }
}
