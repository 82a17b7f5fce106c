//! Project-management sync: pull a project's open issues into the task list.

mod linear;

pub use linear::{LinearClient, LINEAR_API_URL};

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use crate::db::models::{Task, TaskDraft};
use crate::error::{FocusError, FocusResult};
use crate::tasks::TaskStore;

/// Used when an issue carries no estimate.
pub const DEFAULT_ESTIMATE_MINUTES: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteIssue {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub estimate: Option<f64>,
}

impl RemoteIssue {
    pub fn to_draft(&self) -> TaskDraft {
        let minutes = match self.estimate {
            Some(estimate) if estimate.is_finite() => estimate.round().clamp(1.0, u32::MAX as f64) as u32,
            _ => DEFAULT_ESTIMATE_MINUTES,
        };
        TaskDraft::new(
            self.title.trim(),
            self.description.as_deref().unwrap_or_default(),
            minutes,
        )
    }
}

#[async_trait]
pub trait TaskSync: Send + Sync {
    fn name(&self) -> &'static str;

    async fn list_projects(&self) -> FocusResult<Vec<RemoteProject>>;

    async fn list_project_issues(&self, project_id: &str) -> FocusResult<Vec<RemoteIssue>>;

    /// Open issues of a project as task drafts.
    async fn list_project_drafts(&self, project_id: &str) -> FocusResult<Vec<TaskDraft>> {
        Ok(self
            .list_project_issues(project_id)
            .await?
            .iter()
            .filter(|issue| !issue.title.trim().is_empty())
            .map(RemoteIssue::to_draft)
            .collect())
    }

    /// Returns the remote identifier of the new issue.
    async fn create_task(&self, draft: &TaskDraft) -> FocusResult<String>;
}

/// Canned projects for running without a Linear key.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSync;

fn issue(id: &str, title: &str, description: &str, estimate: f64) -> RemoteIssue {
    RemoteIssue {
        id: id.to_string(),
        title: title.to_string(),
        description: Some(description.to_string()),
        estimate: Some(estimate),
    }
}

#[async_trait]
impl TaskSync for OfflineSync {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn list_projects(&self) -> FocusResult<Vec<RemoteProject>> {
        let project = |id: &str, name: &str, description: &str| RemoteProject {
            id: id.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
        };
        Ok(vec![
            project("mock-1", "Website Redesign", "Overhaul the company website"),
            project("mock-2", "Mobile App", "iOS and Android app development"),
            project("mock-3", "API Migration", "Migrate legacy API to GraphQL"),
        ])
    }

    async fn list_project_issues(&self, project_id: &str) -> FocusResult<Vec<RemoteIssue>> {
        Ok(match project_id {
            "mock-1" => vec![
                issue("L-101", "Design Homepage", "Create Figma mockups", 60.0),
                issue("L-102", "Implement Header", "React component for header", 30.0),
                issue("L-103", "Fix CSS Bugs", "Fix mobile layout issues", 45.0),
            ],
            _ => vec![
                issue("L-201", "Setup Repo", "Initialize git repository", 15.0),
                issue("L-202", "Basic Auth", "Implement login flow", 60.0),
            ],
        })
    }

    async fn create_task(&self, draft: &TaskDraft) -> FocusResult<String> {
        info!("Offline sync: pretending to create '{}'", draft.title);
        Ok("mock-new-id".to_string())
    }
}

/// Imports a remote project's open issues as new local tasks.
pub async fn import_project(
    store: &TaskStore,
    sync: &dyn TaskSync,
    project_id: &str,
) -> FocusResult<Vec<Task>> {
    if project_id.trim().is_empty() {
        return Err(FocusError::validation("project_id", "project id must not be empty"));
    }
    let drafts = sync.list_project_drafts(project_id).await?;
    let tasks = store.create_many(drafts).await?;
    info!(
        "Imported {} tasks from {} project {project_id}",
        tasks.len(),
        sync.name()
    );
    Ok(tasks)
}
