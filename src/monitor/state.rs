use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::agent::Evaluation;
use crate::db::models::{FocusCheck, Verdict};

pub const ACTIVITY_LOG_LINES: usize = 20;
/// Consecutive Distracted or Idle verdicts before an alert is raised.
pub const ALERT_THRESHOLD: u32 = 2;

/// Escalation counters and the rolling activity log, updated once per cycle.
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    cycles: u64,
    consecutive_distracted: u32,
    consecutive_unfocused: u32,
    last_evaluation: Option<Evaluation>,
    last_check_at: Option<DateTime<Utc>>,
    activity_log: VecDeque<String>,
}

impl MonitorState {
    /// Folds one completed cycle in; returns whether an alert is due.
    pub fn apply(&mut self, evaluation: &Evaluation, at: DateTime<Utc>) -> bool {
        self.cycles += 1;
        match evaluation.verdict {
            Verdict::OnTrack => {
                self.consecutive_distracted = 0;
                self.consecutive_unfocused = 0;
            }
            Verdict::Distracted => {
                self.consecutive_distracted += 1;
                self.consecutive_unfocused += 1;
            }
            Verdict::Idle => self.consecutive_unfocused += 1,
        }

        if self.activity_log.len() == ACTIVITY_LOG_LINES {
            self.activity_log.pop_front();
        }
        self.activity_log
            .push_back(log_line(evaluation.verdict, &evaluation.message));

        self.last_evaluation = Some(evaluation.clone());
        self.last_check_at = Some(at);
        self.should_alert()
    }

    pub fn should_alert(&self) -> bool {
        self.consecutive_unfocused >= ALERT_THRESHOLD
    }

    pub fn consecutive_distracted(&self) -> u32 {
        self.consecutive_distracted
    }

    pub fn activity_log(&self) -> Vec<String> {
        self.activity_log.iter().cloned().collect()
    }

    pub fn snapshot(&self, running: bool, interval_secs: Option<u64>) -> MonitorStatus {
        MonitorStatus {
            running,
            interval_secs,
            cycles: self.cycles,
            consecutive_distracted: self.consecutive_distracted,
            consecutive_unfocused: self.consecutive_unfocused,
            should_alert: self.should_alert(),
            last_evaluation: self.last_evaluation.clone(),
            last_check_at: self.last_check_at,
            activity_log: self.activity_log(),
        }
    }
}

pub fn log_line(verdict: Verdict, message: &str) -> String {
    format!("{} [{}] {}", verdict.emoji(), verdict.label(), message)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub running: bool,
    pub interval_secs: Option<u64>,
    pub cycles: u64,
    pub consecutive_distracted: u32,
    pub consecutive_unfocused: u32,
    pub should_alert: bool,
    pub last_evaluation: Option<Evaluation>,
    pub last_check_at: Option<DateTime<Utc>>,
    /// Oldest first.
    pub activity_log: Vec<String>,
}

/// Result of one completed check cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub check: FocusCheck,
    pub evaluation: Evaluation,
    pub should_alert: bool,
}
