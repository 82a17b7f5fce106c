use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, parse_verdict},
    models::{FocusCheck, Verdict},
};

fn row_to_focus_check(row: &Row) -> Result<FocusCheck> {
    let verdict: String = row.get("verdict")?;
    let timestamp: String = row.get("timestamp")?;

    Ok(FocusCheck {
        id: row.get("id")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        verdict: parse_verdict(&verdict)?,
        task_id: row.get("task_id")?,
        task_title: row.get("task_title")?,
        message: row.get("message")?,
    })
}

impl Database {
    pub async fn insert_focus_check(
        &self,
        verdict: Verdict,
        task_id: Option<i64>,
        task_title: Option<String>,
        message: String,
        timestamp: DateTime<Utc>,
    ) -> Result<FocusCheck> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO focus_checks (task_id, task_title, verdict, message, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    task_id,
                    task_title,
                    verdict.as_str(),
                    message,
                    format_datetime(&timestamp),
                ],
            )?;
            let id = conn.last_insert_rowid();

            let mut stmt = conn.prepare(
                "SELECT id, task_id, task_title, verdict, message, timestamp
                 FROM focus_checks WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => row_to_focus_check(row),
                None => Err(anyhow!("focus check not found after insert")),
            }
        })
        .await
    }

    /// Checks at or after `since` (all when `None`), oldest first by sequence.
    pub async fn list_focus_checks_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<FocusCheck>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, task_title, verdict, message, timestamp
                 FROM focus_checks
                 WHERE ?1 IS NULL OR timestamp >= ?1
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query(params![since.as_ref().map(format_datetime)])?;
            let mut checks = Vec::new();
            while let Some(row) = rows.next()? {
                checks.push(row_to_focus_check(row)?);
            }
            Ok(checks)
        })
        .await
    }

    /// Most recent first.
    pub async fn recent_focus_checks(&self, limit: usize) -> Result<Vec<FocusCheck>> {
        let limit = i64::try_from(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, task_title, verdict, message, timestamp
                 FROM focus_checks
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut checks = Vec::new();
            while let Some(row) = rows.next()? {
                checks.push(row_to_focus_check(row)?);
            }
            Ok(checks)
        })
        .await
    }
}
