use std::{future::Future, time::Duration};

use async_trait::async_trait;
use log::warn;

use super::error::BackendError;
use crate::db::models::{Task, TaskDraft, Verdict};

/// Attempts per call: one try plus one immediate retry for transient failures.
const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendJudgement {
    pub verdict: Verdict,
    /// Final user-facing text; `None` asks the agent to render `reasoning` with the tone template.
    pub message: Option<String>,
    pub reasoning: String,
}

/// A reasoning engine able to judge focus and plan projects.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn evaluate(&self, task: &Task, content: &str) -> Result<BackendJudgement, BackendError>;

    async fn decompose(&self, description: &str) -> Result<Vec<TaskDraft>, BackendError>;

    fn is_mock(&self) -> bool {
        false
    }
}

/// Runs `op` under `timeout`, retrying once when the failure is transient.
pub(crate) async fn call_with_retry<T, F, Fut>(
    backend: &'static str,
    timeout: Duration,
    mut op: F,
) -> Result<T, BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let mut attempt = 1;
    loop {
        let result = match tokio::time::timeout(timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(timeout)),
        };

        match result {
            Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                warn!("{backend} call failed ({}), retrying: {err}", err.code());
                attempt += 1;
            }
            other => return other,
        }
    }
}
