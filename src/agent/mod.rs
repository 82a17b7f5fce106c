//! Focus Agent: turns an active task and an activity snapshot into a verdict and a nudge.

mod backend;
pub mod error;
pub mod extract;
mod mock;
mod prompts;
mod providers;
mod selection;

pub use backend::{Backend, BackendJudgement};
pub(crate) use backend::call_with_retry;
pub use error::BackendError;
pub use mock::{concepts, template_drafts, MockBackend};
pub use prompts::{IDLE_NUDGES, NO_TASK_MESSAGE};
pub use providers::{HttpBackend, ProviderKind};
pub use selection::{probe_local, select_backend, BackendSelection, BackendSource};

use std::{sync::Arc, time::Duration};

use log::warn;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::activity::ActivitySnapshot;
use crate::db::models::{Task, Verdict};

pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(12);

/// Label used when no backend was consulted.
const NO_BACKEND: &str = "none";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub verdict: Verdict,
    pub message: String,
    /// Backend that produced the verdict, or `"none"` for short-circuited checks.
    pub backend: &'static str,
    /// The selected backend failed and the mock answered instead.
    pub degraded: bool,
}

#[derive(Clone)]
pub struct FocusAgent {
    backend: Arc<dyn Backend>,
    fallback: MockBackend,
    timeout: Duration,
}

impl FocusAgent {
    pub fn new(backend: Arc<dyn Backend>, timeout: Duration) -> Self {
        Self {
            backend,
            fallback: MockBackend::new(),
            timeout,
        }
    }

    pub fn mock() -> Self {
        Self::new(Arc::new(MockBackend::new()), DEFAULT_BACKEND_TIMEOUT)
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn evaluate(
        &self,
        active_task: Option<&Task>,
        snapshot: Option<&ActivitySnapshot>,
    ) -> Evaluation {
        let Some(task) = active_task else {
            return Evaluation {
                verdict: Verdict::Idle,
                message: NO_TASK_MESSAGE.to_string(),
                backend: NO_BACKEND,
                degraded: false,
            };
        };

        let Some(snapshot) = snapshot.filter(|s| !s.is_blank()) else {
            let nudge = IDLE_NUDGES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(IDLE_NUDGES[0]);
            return Evaluation {
                verdict: Verdict::Idle,
                message: nudge.to_string(),
                backend: NO_BACKEND,
                degraded: false,
            };
        };

        let backend = Arc::clone(&self.backend);
        let result = call_with_retry(backend.name(), self.timeout, || {
            backend.evaluate(task, &snapshot.content)
        })
        .await;

        match result {
            Ok(judgement) => Self::finish(task, judgement, backend.name(), false),
            Err(err) => {
                warn!(
                    "{} evaluation failed ({}), using mock: {err}",
                    backend.name(),
                    err.code()
                );
                let judgement = mock::judge(task, &snapshot.content);
                Self::finish(task, judgement, self.fallback.name(), true)
            }
        }
    }

    fn finish(
        task: &Task,
        judgement: BackendJudgement,
        backend: &'static str,
        degraded: bool,
    ) -> Evaluation {
        let message = match judgement.message {
            Some(message) if !degraded => message,
            _ => prompts::render_message(judgement.verdict, task, &judgement.reasoning),
        };
        Evaluation {
            verdict: judgement.verdict,
            message,
            backend,
            degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::TaskStatus;
    use chrono::Utc;

    fn task() -> Task {
        Task {
            id: 1,
            title: "Implement login endpoint".into(),
            description: String::new(),
            estimated_duration: 25,
            status: TaskStatus::InProgress,
            position: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn blank_snapshot_is_idle_without_backend() {
        let agent = FocusAgent::mock();
        let snapshot = ActivitySnapshot::text("   \n");
        let evaluation = agent.evaluate(Some(&task()), Some(&snapshot)).await;
        assert_eq!(evaluation.verdict, Verdict::Idle);
        assert_eq!(evaluation.backend, "none");
        assert!(IDLE_NUDGES.contains(&evaluation.message.as_str()));
    }

    #[tokio::test]
    async fn mock_messages_use_the_tone_templates() {
        let agent = FocusAgent::mock();
        let snapshot = ActivitySnapshot::text("edited auth.py: added password hashing");
        let evaluation = agent.evaluate(Some(&task()), Some(&snapshot)).await;
        assert_eq!(evaluation.verdict, Verdict::OnTrack);
        assert_eq!(evaluation.backend, "mock");
        assert!(evaluation.message.starts_with("✅"));
        assert!(evaluation.message.ends_with("🦉"));
        assert!(!evaluation.degraded);
    }
}
