use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, parse_status, to_i64, to_u32},
    models::{Task, TaskDraft, TaskStatus, TaskUpdate},
};
use crate::error::FocusError;

const TASK_COLUMNS: &str =
    "id, title, description, status, estimated_duration, position, created_at, updated_at";

fn row_to_task(row: &Row) -> Result<Task> {
    let status: String = row.get("status")?;
    let estimated_duration: i64 = row.get("estimated_duration")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        estimated_duration: to_u32(estimated_duration, "estimated_duration")?,
        status: parse_status(&status)?,
        position: row.get("position")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn fetch_task(conn: &Connection, task_id: i64) -> Result<Option<Task>> {
    let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
    let mut rows = stmt.query(params![task_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_task(row)?)),
        None => Ok(None),
    }
}

fn require_task(conn: &Connection, task_id: i64) -> Result<Task> {
    fetch_task(conn, task_id)?.ok_or_else(|| FocusError::NotFound { id: task_id }.into())
}

fn next_position(conn: &Connection) -> Result<i64> {
    let max: Option<i64> = conn.query_row("SELECT MAX(position) FROM tasks", [], |row| row.get(0))?;
    Ok(max.unwrap_or(0) + 1)
}

fn insert_draft(conn: &Connection, draft: &TaskDraft, position: i64) -> Result<i64> {
    let now = format_datetime(&Utc::now());
    conn.execute(
        "INSERT INTO tasks (title, description, status, estimated_duration, position, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            draft.title,
            draft.description,
            TaskStatus::Todo.as_str(),
            to_i64(draft.duration),
            position,
            now,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    pub async fn insert_task(&self, draft: TaskDraft) -> Result<Task> {
        self.execute(move |conn| {
            let position = next_position(conn)?;
            let task_id = insert_draft(conn, &draft, position)?;
            require_task(conn, task_id)
        })
        .await
    }

    /// Inserts every draft in one transaction, preserving order.
    pub async fn insert_tasks(&self, drafts: Vec<TaskDraft>) -> Result<Vec<Task>> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut position = next_position(&tx)?;
            let mut ids = Vec::with_capacity(drafts.len());
            for draft in &drafts {
                ids.push(insert_draft(&tx, draft, position)?);
                position += 1;
            }
            let mut tasks = Vec::with_capacity(ids.len());
            for task_id in ids {
                tasks.push(require_task(&tx, task_id)?);
            }
            tx.commit()?;
            Ok(tasks)
        })
        .await
    }

    /// Deletes every task and inserts `drafts`, in one transaction.
    pub async fn replace_tasks(&self, drafts: Vec<TaskDraft>) -> Result<(usize, Vec<Task>)> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let cleared = tx.execute("DELETE FROM tasks", [])?;
            let mut ids = Vec::with_capacity(drafts.len());
            for (index, draft) in drafts.iter().enumerate() {
                ids.push(insert_draft(&tx, draft, i64::try_from(index)? + 1)?);
            }
            let mut tasks = Vec::with_capacity(ids.len());
            for task_id in ids {
                tasks.push(require_task(&tx, task_id)?);
            }
            tx.commit()?;
            Ok((cleared, tasks))
        })
        .await
    }

    pub async fn get_task(&self, task_id: i64) -> Result<Option<Task>> {
        self.execute(move |conn| fetch_task(conn, task_id)).await
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks ORDER BY position ASC, id ASC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut tasks = Vec::new();
            while let Some(row) = rows.next()? {
                tasks.push(row_to_task(row)?);
            }

            Ok(tasks)
        })
        .await
    }

    pub async fn get_active_task(&self) -> Result<Option<Task>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE status = 'InProgress'
                 ORDER BY position ASC
                 LIMIT 1"
            ))?;

            let mut rows = stmt.query([])?;
            let task = match rows.next()? {
                Some(row) => Some(row_to_task(row)?),
                None => None,
            };
            Ok(task)
        })
        .await
    }

    pub async fn update_task(&self, task_id: i64, update: TaskUpdate) -> Result<Task> {
        self.execute(move |conn| {
            let mut updates = Vec::new();
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(title) = update.title {
                updates.push("title = ?");
                params_vec.push(Box::new(title));
            }
            if let Some(description) = update.description {
                updates.push("description = ?");
                params_vec.push(Box::new(description));
            }
            if let Some(duration) = update.estimated_duration {
                updates.push("estimated_duration = ?");
                params_vec.push(Box::new(to_i64(duration)));
            }

            if updates.is_empty() {
                return Err(FocusError::validation("update", "no fields to update").into());
            }

            updates.push("updated_at = ?");
            params_vec.push(Box::new(format_datetime(&Utc::now())));
            params_vec.push(Box::new(task_id));

            let query = format!("UPDATE tasks SET {} WHERE id = ?", updates.join(", "));
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let rows_affected = conn.execute(&query, params_refs.as_slice())?;
            if rows_affected == 0 {
                return Err(FocusError::NotFound { id: task_id }.into());
            }

            require_task(conn, task_id)
        })
        .await
    }

    pub async fn delete_task(&self, task_id: i64) -> Result<()> {
        self.execute(move |conn| {
            let rows_affected = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            if rows_affected == 0 {
                return Err(FocusError::NotFound { id: task_id }.into());
            }
            Ok(())
        })
        .await
    }

    /// Promotes `task_id` to In Progress and demotes any other active task, atomically.
    pub async fn start_task(&self, task_id: i64) -> Result<Task> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let task = require_task(&tx, task_id)?;

            if task.status == TaskStatus::Done {
                return Err(FocusError::InvalidTransition {
                    id: task_id,
                    from: TaskStatus::Done,
                    to: TaskStatus::InProgress,
                }
                .into());
            }

            let now = format_datetime(&Utc::now());
            tx.execute(
                "UPDATE tasks SET status = 'Todo', updated_at = ?1
                 WHERE status = 'InProgress' AND id != ?2",
                params![now, task_id],
            )?;
            tx.execute(
                "UPDATE tasks SET status = 'InProgress', updated_at = ?1 WHERE id = ?2",
                params![now, task_id],
            )?;

            let started = require_task(&tx, task_id)?;
            tx.commit()?;
            Ok(started)
        })
        .await
    }

    pub async fn complete_task(&self, task_id: i64) -> Result<Task> {
        self.execute(move |conn| {
            let task = require_task(conn, task_id)?;
            if task.status == TaskStatus::Done {
                return Ok(task);
            }

            conn.execute(
                "UPDATE tasks SET status = 'Done', updated_at = ?1 WHERE id = ?2",
                params![format_datetime(&Utc::now()), task_id],
            )?;
            require_task(conn, task_id)
        })
        .await
    }

    /// Rewrites positions in the given order; unknown ids are skipped.
    pub async fn reorder_tasks(&self, task_ids: Vec<i64>) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            for (index, task_id) in task_ids.iter().enumerate() {
                let position = i64::try_from(index)? + 1;
                tx.execute(
                    "UPDATE tasks SET position = ?1 WHERE id = ?2",
                    params![position, task_id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn clear_tasks(&self) -> Result<usize> {
        self.execute(|conn| Ok(conn.execute("DELETE FROM tasks", [])?))
            .await
    }
}
