use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::db::models::{FocusCheck, Verdict};

pub const TREND_DAYS: i64 = 7;

/// Range of checks the focus score and streaks are computed over.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum MetricsWindow {
    /// The local calendar day.
    #[default]
    Today,
    AllTime,
}

impl MetricsWindow {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" | "day" => Some(MetricsWindow::Today),
            "all" | "alltime" | "all_time" | "all-time" => Some(MetricsWindow::AllTime),
            _ => None,
        }
    }

    fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            MetricsWindow::Today => date == today,
            MetricsWindow::AllTime => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StateDistribution {
    pub on_track: u32,
    pub distracted: u32,
    pub idle: u32,
}

impl StateDistribution {
    pub fn add(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::OnTrack => self.on_track += 1,
            Verdict::Distracted => self.distracted += 1,
            Verdict::Idle => self.idle += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.on_track + self.distracted + self.idle
    }

    pub fn get(&self, verdict: Verdict) -> u32 {
        match verdict {
            Verdict::OnTrack => self.on_track,
            Verdict::Distracted => self.distracted,
            Verdict::Idle => self.idle,
        }
    }

    /// `round(100 * on_track / total)`, 0 when empty.
    pub fn focus_score(&self) -> u32 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        (f64::from(self.on_track) * 100.0 / f64::from(total)).round() as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyFocus {
    pub date: NaiveDate,
    pub focus_score: u32,
    pub distribution: StateDistribution,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityMetrics {
    pub window: MetricsWindow,
    pub total_checks: u32,
    pub focus_score: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    pub state_distribution: StateDistribution,
    /// Oldest first, ending with the day of `now`.
    pub weekly_trend: Vec<DailyFocus>,
}

impl ProductivityMetrics {
    /// Derives the metrics from a check log ordered oldest first.
    ///
    /// Calendar days are taken in the time zone of `now`.
    pub fn from_checks<Tz: TimeZone>(
        checks: &[FocusCheck],
        window: MetricsWindow,
        now: DateTime<Tz>,
    ) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();

        let mut distribution = StateDistribution::default();
        let mut current_streak = 0;
        let mut best_streak = 0;

        let mut trend: Vec<DailyFocus> = (0..TREND_DAYS)
            .rev()
            .filter_map(|offset| today.checked_sub_signed(chrono::Duration::days(offset)))
            .map(|date| DailyFocus {
                date,
                focus_score: 0,
                distribution: StateDistribution::default(),
            })
            .collect();

        for check in checks {
            let date = check.timestamp.with_timezone(&tz).date_naive();

            if let Some(day) = trend.iter_mut().find(|day| day.date == date) {
                day.distribution.add(check.verdict);
            }

            if !window.contains(date, today) {
                continue;
            }

            distribution.add(check.verdict);
            if check.verdict == Verdict::OnTrack {
                current_streak += 1;
                best_streak = best_streak.max(current_streak);
            } else {
                current_streak = 0;
            }
        }

        for day in &mut trend {
            day.focus_score = day.distribution.focus_score();
        }

        Self {
            window,
            total_checks: distribution.total(),
            focus_score: distribution.focus_score(),
            current_streak,
            best_streak,
            state_distribution: distribution,
            weekly_trend: trend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn check(id: i64, verdict: Verdict, timestamp: DateTime<Utc>) -> FocusCheck {
        FocusCheck {
            id,
            timestamp,
            verdict,
            task_id: Some(1),
            task_title: Some("Task".into()),
            message: String::new(),
        }
    }

    fn sequence(verdicts: &[Verdict], now: DateTime<Utc>) -> Vec<FocusCheck> {
        verdicts
            .iter()
            .enumerate()
            .map(|(i, v)| check(i as i64 + 1, *v, now))
            .collect()
    }

    #[test]
    fn empty_log_scores_zero() {
        let now = Utc::now();
        let metrics = ProductivityMetrics::from_checks(&[], MetricsWindow::Today, now);
        assert_eq!(metrics.total_checks, 0);
        assert_eq!(metrics.focus_score, 0);
        assert_eq!(metrics.current_streak, 0);
        assert_eq!(metrics.weekly_trend.len(), 7);
        assert_eq!(metrics.weekly_trend.last().unwrap().date, now.date_naive());
    }

    #[test]
    fn streak_counts_trailing_on_track_only() {
        use Verdict::*;
        let now = Utc::now();
        let checks = sequence(&[OnTrack, OnTrack, OnTrack, Distracted, OnTrack, OnTrack], now);
        let metrics = ProductivityMetrics::from_checks(&checks, MetricsWindow::AllTime, now);
        assert_eq!(metrics.current_streak, 2);
        assert_eq!(metrics.best_streak, 3);
        assert_eq!(metrics.focus_score, 83);

        let checks = sequence(&[OnTrack, OnTrack, Idle], now);
        let metrics = ProductivityMetrics::from_checks(&checks, MetricsWindow::AllTime, now);
        assert_eq!(metrics.current_streak, 0);
    }

    #[test]
    fn score_bounds() {
        use Verdict::*;
        let now = Utc::now();
        let all_on = sequence(&[OnTrack; 4], now);
        assert_eq!(
            ProductivityMetrics::from_checks(&all_on, MetricsWindow::Today, now).focus_score,
            100
        );
        let none_on = sequence(&[Idle, Distracted, Idle], now);
        assert_eq!(
            ProductivityMetrics::from_checks(&none_on, MetricsWindow::Today, now).focus_score,
            0
        );
    }

    #[test]
    fn today_window_ignores_earlier_days_but_trend_keeps_them() {
        let now = Utc::now();
        let yesterday = now - Duration::days(1);
        let checks = vec![
            check(1, Verdict::Distracted, yesterday),
            check(2, Verdict::Distracted, yesterday),
            check(3, Verdict::OnTrack, now),
        ];

        let today = ProductivityMetrics::from_checks(&checks, MetricsWindow::Today, now);
        assert_eq!(today.total_checks, 1);
        assert_eq!(today.focus_score, 100);

        let all = ProductivityMetrics::from_checks(&checks, MetricsWindow::AllTime, now);
        assert_eq!(all.total_checks, 3);
        assert_eq!(all.focus_score, 33);

        let previous_day = &today.weekly_trend[5];
        assert_eq!(previous_day.date, yesterday.date_naive());
        assert_eq!(previous_day.distribution.distracted, 2);
        assert_eq!(previous_day.focus_score, 0);
    }

    #[test]
    fn window_parse_accepts_aliases() {
        assert_eq!(MetricsWindow::parse("all"), Some(MetricsWindow::AllTime));
        assert_eq!(MetricsWindow::parse(" Today "), Some(MetricsWindow::Today));
        assert_eq!(MetricsWindow::parse("week"), None);
    }
}
