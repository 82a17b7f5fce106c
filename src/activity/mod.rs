//! Activity sources: where the focus loop learns what the user is doing.

mod file_watch;
mod filter;
mod manual;

pub use file_watch::{FileWatchSource, EXCERPT_CHARS, MAX_EXCERPTS};
pub use filter::ActivityFilter;
pub use manual::{ManualTextHandle, ManualTextSource};

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FocusResult;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    FileDiff,
    TextSnapshot,
}

/// Bounded excerpt of recent activity. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    pub source_kind: SourceKind,
    pub content: String,
    /// First-touch order; empty for text snapshots.
    pub touched_paths: Vec<PathBuf>,
    pub timestamp: DateTime<Utc>,
}

impl ActivitySnapshot {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            source_kind: SourceKind::TextSnapshot,
            content: content.into(),
            touched_paths: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[async_trait]
pub trait ActivitySource: Send {
    fn kind(&self) -> SourceKind;

    /// Never waits for new activity; `None` when nothing is ready.
    async fn capture(&mut self) -> FocusResult<Option<ActivitySnapshot>>;

    /// Releases OS resources. Later captures return `None`.
    fn close(&mut self);
}
