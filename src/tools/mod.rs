//! Transport-independent tool-call and resource surface.
//!
//! Calls arrive as JSON `{"tool": "<name>", "args": {...}}` and answer with JSON.
//! Failures are [`ToolFailure`] values rather than transport errors.

mod failure;

pub use failure::{ToolFailure, FAILURE_MARKER};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::db::models::{TaskSummary, TaskUpdate};
use crate::metrics::{MetricsTracker, ProductivityMetrics};
use crate::tasks::TaskStore;
use crate::timer::PomodoroTimer;

pub const DEFAULT_TASK_MINUTES: u32 = 30;

pub const RESOURCE_ALL_TASKS: &str = "focusflow://tasks/all";
pub const RESOURCE_ACTIVE_TASK: &str = "focusflow://tasks/active";
pub const RESOURCE_STATS: &str = "focusflow://stats";

fn default_task_minutes() -> u32 {
    DEFAULT_TASK_MINUTES
}

/// The wire envelope. `args` may be omitted, `null` or `{}` for tools without arguments.
#[derive(Deserialize)]
struct ToolRequest {
    tool: String,
    #[serde(default)]
    args: Option<Map<String, Value>>,
}

/// A parsed call. Deserializes from the flattened form (`{"tool": ..., <args>}`);
/// use [`ToolCall::from_json`] for the `{"tool", "args"}` envelope.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    AddTask {
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default = "default_task_minutes")]
        duration: u32,
    },
    GetCurrentTask,
    StartTask {
        task_id: i64,
    },
    MarkTaskDone {
        task_id: i64,
    },
    GetAllTasks,
    DeleteTask {
        task_id: i64,
    },
    GetProductivityStats,
    UpdateTask {
        task_id: i64,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        duration: Option<u32>,
    },
    PomodoroStart,
    PomodoroPause,
    PomodoroReset,
    PomodoroStatus,
}

impl ToolCall {
    pub const NAMES: [&'static str; 12] = [
        "add_task",
        "get_current_task",
        "start_task",
        "mark_task_done",
        "get_all_tasks",
        "delete_task",
        "get_productivity_stats",
        "update_task",
        "pomodoro_start",
        "pomodoro_pause",
        "pomodoro_reset",
        "pomodoro_status",
    ];

    pub fn from_json(raw: &str) -> Result<Self, ToolFailure> {
        let invalid = |e: serde_json::Error| ToolFailure::invalid_request(e.to_string());
        let request: ToolRequest = serde_json::from_str(raw).map_err(invalid)?;
        let mut fields = request.args.unwrap_or_default();
        fields.insert("tool".to_string(), Value::String(request.tool));
        serde_json::from_value(Value::Object(fields)).map_err(invalid)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityStats {
    pub metrics: ProductivityMetrics,
    pub tasks: TaskSummary,
}

#[derive(Clone)]
pub struct ToolSurface {
    store: TaskStore,
    metrics: MetricsTracker,
    timer: PomodoroTimer,
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ToolFailure> {
    serde_json::to_value(value)
        .map_err(|e| ToolFailure::new("serialization_error", e.to_string(), "Report this as a bug."))
}

impl ToolSurface {
    pub fn new(store: TaskStore, metrics: MetricsTracker, timer: PomodoroTimer) -> Self {
        Self {
            store,
            metrics,
            timer,
        }
    }

    pub async fn call(&self, call: ToolCall) -> Result<Value, ToolFailure> {
        debug!("tool call {call:?}");
        match call {
            ToolCall::AddTask {
                title,
                description,
                duration,
            } => to_json(&self.store.create(&title, &description, duration).await?),
            ToolCall::GetCurrentTask => {
                let active = self.store.get_active().await?;
                Ok(json!({ "active": to_json(&active)? }))
            }
            ToolCall::StartTask { task_id } => to_json(&self.store.start(task_id).await?),
            ToolCall::MarkTaskDone { task_id } => to_json(&self.store.complete(task_id).await?),
            ToolCall::GetAllTasks => to_json(&self.store.list().await?),
            ToolCall::DeleteTask { task_id } => {
                self.store.delete(task_id).await?;
                Ok(json!({ "deleted": task_id }))
            }
            ToolCall::GetProductivityStats => to_json(&self.stats().await?),
            ToolCall::UpdateTask {
                task_id,
                title,
                description,
                duration,
            } => {
                let update = TaskUpdate {
                    title,
                    description,
                    estimated_duration: duration,
                };
                to_json(&self.store.update(task_id, update).await?)
            }
            ToolCall::PomodoroStart => to_json(&self.timer.start()),
            ToolCall::PomodoroPause => to_json(&self.timer.pause()),
            ToolCall::PomodoroReset => to_json(&self.timer.reset()),
            ToolCall::PomodoroStatus => to_json(&self.timer.status()),
        }
    }

    /// Parses, dispatches and renders; the result is either the answer or a failure object.
    pub async fn call_json(&self, raw: &str) -> Value {
        let outcome = match ToolCall::from_json(raw) {
            Ok(call) => self.call(call).await,
            Err(failure) => Err(failure),
        };
        match outcome {
            Ok(value) => value,
            Err(failure) => json!({ "error": failure }),
        }
    }

    pub async fn read_resource(&self, uri: &str) -> Result<Value, ToolFailure> {
        match uri {
            RESOURCE_ALL_TASKS => self.call(ToolCall::GetAllTasks).await,
            RESOURCE_ACTIVE_TASK => self.call(ToolCall::GetCurrentTask).await,
            RESOURCE_STATS => self.call(ToolCall::GetProductivityStats).await,
            other => Err(ToolFailure::unknown_resource(other)),
        }
    }

    async fn stats(&self) -> Result<ProductivityStats, ToolFailure> {
        Ok(ProductivityStats {
            metrics: self.metrics.compute_default().await?,
            tasks: self.store.summary().await?,
        })
    }
}
