use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one focus check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    OnTrack,
    Distracted,
    Idle,
}

impl Verdict {
    pub const ALL: [Verdict; 3] = [Verdict::OnTrack, Verdict::Distracted, Verdict::Idle];

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::OnTrack => "OnTrack",
            Verdict::Distracted => "Distracted",
            Verdict::Idle => "Idle",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::OnTrack => "On Track",
            Verdict::Distracted => "Distracted",
            Verdict::Idle => "Idle",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Verdict::OnTrack => "✅",
            Verdict::Distracted => "⚠️",
            Verdict::Idle => "💤",
        }
    }

    /// Lenient parse of model output ("On Track", "on_track", "ONTRACK", ...).
    pub fn parse_loose(value: &str) -> Option<Verdict> {
        let normalized: String = value
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "ontrack" | "focused" => Some(Verdict::OnTrack),
            "distracted" | "offtrack" => Some(Verdict::Distracted),
            "idle" | "inactive" => Some(Verdict::Idle),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One append-only record in the focus-check log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusCheck {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub verdict: Verdict,
    pub task_id: Option<i64>,
    pub task_title: Option<String>,
    pub message: String,
}
