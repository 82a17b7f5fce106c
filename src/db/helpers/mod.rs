use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::db::models::{TaskStatus, Verdict};

pub fn to_i64(value: u32) -> i64 {
    i64::from(value)
}

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

/// Fixed-width UTC timestamps, so that text comparison in SQL matches time order.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_status(value: &str) -> Result<TaskStatus> {
    match value {
        "Todo" => Ok(TaskStatus::Todo),
        "InProgress" => Ok(TaskStatus::InProgress),
        "Done" => Ok(TaskStatus::Done),
        other => Err(anyhow!("unknown task status {other}")),
    }
}

pub fn parse_verdict(value: &str) -> Result<Verdict> {
    match value {
        "OnTrack" => Ok(Verdict::OnTrack),
        "Distracted" => Ok(Verdict::Distracted),
        "Idle" => Ok(Verdict::Idle),
        other => Err(anyhow!("unknown verdict {other}")),
    }
}
