mod types;

pub use types::{DailyFocus, MetricsWindow, ProductivityMetrics, StateDistribution, TREND_DAYS};

use chrono::{Duration, Local, Utc};
use log::debug;

use crate::db::{
    models::{FocusCheck, Task, Verdict},
    Database,
};
use crate::error::{FocusError, FocusResult};

/// Append-only focus-check log plus derived productivity metrics.
#[derive(Clone)]
pub struct MetricsTracker {
    db: Database,
    default_window: MetricsWindow,
}

impl MetricsTracker {
    pub fn new(db: Database, default_window: MetricsWindow) -> Self {
        Self { db, default_window }
    }

    pub fn default_window(&self) -> MetricsWindow {
        self.default_window
    }

    pub async fn record(
        &self,
        verdict: Verdict,
        task: Option<&Task>,
        message: &str,
    ) -> FocusResult<FocusCheck> {
        let check = self
            .db
            .insert_focus_check(
                verdict,
                task.map(|t| t.id),
                task.map(|t| t.title.clone()),
                message.to_string(),
                Utc::now(),
            )
            .await
            .map_err(FocusError::from_anyhow)?;
        debug!("Recorded focus check {} ({})", check.id, check.verdict);
        Ok(check)
    }

    pub async fn compute(&self, window: MetricsWindow) -> FocusResult<ProductivityMetrics> {
        let now = Local::now();
        // The trend needs the last seven local days even when the window is smaller.
        let since = match window {
            MetricsWindow::Today => Some(Utc::now() - Duration::days(TREND_DAYS)),
            MetricsWindow::AllTime => None,
        };
        let checks = self
            .db
            .list_focus_checks_since(since)
            .await
            .map_err(FocusError::from_anyhow)?;
        Ok(ProductivityMetrics::from_checks(&checks, window, now))
    }

    pub async fn compute_default(&self) -> FocusResult<ProductivityMetrics> {
        self.compute(self.default_window).await
    }

    /// Most recent first.
    pub async fn history(&self, limit: usize) -> FocusResult<Vec<FocusCheck>> {
        self.db
            .recent_focus_checks(limit)
            .await
            .map_err(FocusError::from_anyhow)
    }
}
