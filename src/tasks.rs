//! Task Store: validated task lifecycle over the database worker.
//!
//! The single-active-task rule is enforced inside the `start` transaction and
//! backed by a partial unique index, so no reader ever sees two tasks in progress.

use log::info;

use crate::db::{
    models::{Task, TaskDraft, TaskSummary, TaskUpdate},
    Database,
};
use crate::error::{FocusError, FocusResult};

#[derive(Clone)]
pub struct TaskStore {
    db: Database,
}

impl TaskStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn create(
        &self,
        title: &str,
        description: &str,
        duration: u32,
    ) -> FocusResult<Task> {
        let draft = validate_draft(TaskDraft::new(title, description, duration))?;
        let task = self
            .db
            .insert_task(draft)
            .await
            .map_err(FocusError::from_anyhow)?;
        info!("Created task {} '{}'", task.id, task.title);
        Ok(task)
    }

    /// Inserts all drafts or none.
    pub async fn create_many(&self, drafts: Vec<TaskDraft>) -> FocusResult<Vec<Task>> {
        let drafts = drafts
            .into_iter()
            .map(validate_draft)
            .collect::<FocusResult<Vec<_>>>()?;
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        let tasks = self
            .db
            .insert_tasks(drafts)
            .await
            .map_err(FocusError::from_anyhow)?;
        info!("Created {} tasks", tasks.len());
        Ok(tasks)
    }

    /// Swaps the whole list for `drafts`; returns the number of removed tasks.
    pub async fn replace_all(&self, drafts: Vec<TaskDraft>) -> FocusResult<(usize, Vec<Task>)> {
        let drafts = drafts
            .into_iter()
            .map(validate_draft)
            .collect::<FocusResult<Vec<_>>>()?;
        let (cleared, tasks) = self
            .db
            .replace_tasks(drafts)
            .await
            .map_err(FocusError::from_anyhow)?;
        info!("Replaced {cleared} tasks with {}", tasks.len());
        Ok((cleared, tasks))
    }

    pub async fn update(&self, id: i64, update: TaskUpdate) -> FocusResult<Task> {
        if update.is_empty() {
            return Err(FocusError::validation(
                "update",
                "provide at least one of title, description or duration",
            ));
        }
        let update = TaskUpdate {
            title: update
                .title
                .map(|title| validate_title(&title))
                .transpose()?,
            description: update.description.map(|d| d.trim().to_string()),
            estimated_duration: update
                .estimated_duration
                .map(validate_duration)
                .transpose()?,
        };
        self.db
            .update_task(id, update)
            .await
            .map_err(FocusError::from_anyhow)
    }

    pub async fn delete(&self, id: i64) -> FocusResult<()> {
        self.db
            .delete_task(id)
            .await
            .map_err(FocusError::from_anyhow)?;
        info!("Deleted task {id}");
        Ok(())
    }

    pub async fn list(&self) -> FocusResult<Vec<Task>> {
        self.db.list_tasks().await.map_err(FocusError::from_anyhow)
    }

    pub async fn get(&self, id: i64) -> FocusResult<Task> {
        self.db
            .get_task(id)
            .await
            .map_err(FocusError::from_anyhow)?
            .ok_or(FocusError::NotFound { id })
    }

    pub async fn start(&self, id: i64) -> FocusResult<Task> {
        let task = self
            .db
            .start_task(id)
            .await
            .map_err(FocusError::from_anyhow)?;
        info!("Started task {} '{}'", task.id, task.title);
        Ok(task)
    }

    /// Idempotent: completing a done task returns it unchanged.
    pub async fn complete(&self, id: i64) -> FocusResult<Task> {
        self.db
            .complete_task(id)
            .await
            .map_err(FocusError::from_anyhow)
    }

    pub async fn get_active(&self) -> FocusResult<Option<Task>> {
        self.db
            .get_active_task()
            .await
            .map_err(FocusError::from_anyhow)
    }

    pub async fn clear(&self) -> FocusResult<usize> {
        let removed = self
            .db
            .clear_tasks()
            .await
            .map_err(FocusError::from_anyhow)?;
        info!("Cleared {removed} tasks");
        Ok(removed)
    }

    pub async fn reorder(&self, ids: Vec<i64>) -> FocusResult<Vec<Task>> {
        self.db
            .reorder_tasks(ids)
            .await
            .map_err(FocusError::from_anyhow)?;
        self.list().await
    }

    pub async fn summary(&self) -> FocusResult<TaskSummary> {
        let tasks = self.list().await?;
        Ok(TaskSummary::from_tasks(&tasks))
    }
}

fn validate_title(title: &str) -> FocusResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(FocusError::validation("title", "title must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn validate_duration(duration: u32) -> FocusResult<u32> {
    if duration == 0 {
        return Err(FocusError::validation(
            "duration",
            "duration must be a positive number of minutes",
        ));
    }
    Ok(duration)
}

fn validate_draft(draft: TaskDraft) -> FocusResult<TaskDraft> {
    Ok(TaskDraft {
        title: validate_title(&draft.title)?,
        description: draft.description.trim().to_string(),
        duration: validate_duration(draft.duration)?,
    })
}
