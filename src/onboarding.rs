//! Onboarding Decomposer: project description in, a short ordered task plan out.

use std::{sync::Arc, time::Duration};

use log::{info, warn};
use serde::Serialize;

use crate::agent::{call_with_retry, template_drafts, Backend, FocusAgent};
use crate::db::models::{Task, TaskDraft};
use crate::error::{FocusError, FocusResult};
use crate::tasks::TaskStore;

pub const MIN_DRAFTS: usize = 5;
pub const MAX_DRAFTS: usize = 8;
pub const MIN_MINUTES: u32 = 15;
pub const MAX_MINUTES: u32 = 30;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingOutcome {
    pub tasks: Vec<Task>,
    /// Tasks removed before inserting the new plan.
    pub cleared: usize,
}

#[derive(Clone)]
pub struct OnboardingDecomposer {
    backend: Arc<dyn Backend>,
    timeout: Duration,
}

impl OnboardingDecomposer {
    pub fn new(backend: Arc<dyn Backend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Shares the agent's backend handle.
    pub fn from_agent(agent: &FocusAgent) -> Self {
        Self::new(agent.backend(), agent.timeout())
    }

    /// Always 5..=8 drafts with durations in 15..=30 minutes.
    pub async fn decompose(&self, description: &str) -> Vec<TaskDraft> {
        if self.backend.is_mock() {
            return template_drafts(description);
        }

        let backend = Arc::clone(&self.backend);
        let result = call_with_retry(backend.name(), self.timeout, || {
            backend.decompose(description)
        })
        .await;

        match result {
            Ok(drafts) => match normalize(drafts) {
                Some(drafts) => drafts,
                None => {
                    warn!(
                        "{} returned fewer than {MIN_DRAFTS} usable tasks, using templates",
                        backend.name()
                    );
                    template_drafts(description)
                }
            },
            Err(err) => {
                warn!(
                    "{} decomposition failed ({}), using templates: {err}",
                    backend.name(),
                    err.code()
                );
                template_drafts(description)
            }
        }
    }

    /// Decomposes `description` and stores the plan, replacing existing tasks when `replace`.
    pub async fn onboard(
        &self,
        store: &TaskStore,
        description: &str,
        replace: bool,
    ) -> FocusResult<OnboardingOutcome> {
        let description = description.trim();
        if description.is_empty() {
            return Err(FocusError::validation(
                "description",
                "describe the project you want to build",
            ));
        }

        let drafts = self.decompose(description).await;
        let (cleared, tasks) = if replace {
            store.replace_all(drafts).await?
        } else {
            (0, store.create_many(drafts).await?)
        };
        info!("Onboarded '{description}' into {} tasks", tasks.len());

        Ok(OnboardingOutcome { tasks, cleared })
    }
}

/// Drops untitled drafts, clamps durations and truncates; `None` if too few remain.
pub fn normalize(drafts: Vec<TaskDraft>) -> Option<Vec<TaskDraft>> {
    let normalized: Vec<TaskDraft> = drafts
        .into_iter()
        .filter(|draft| !draft.title.trim().is_empty())
        .take(MAX_DRAFTS)
        .map(|draft| TaskDraft {
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            duration: draft.duration.clamp(MIN_MINUTES, MAX_MINUTES),
        })
        .collect();

    (normalized.len() >= MIN_DRAFTS).then_some(normalized)
}
