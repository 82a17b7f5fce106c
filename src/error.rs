use thiserror::Error;

use crate::db::models::TaskStatus;

pub type FocusResult<T> = std::result::Result<T, FocusError>;

/// Failures surfaced to callers of the task store, metrics tracker and tool surface.
///
/// Backend failures never reach callers of the agent or decomposer; they degrade to
/// the mock judgement instead. `BackendUnavailable` is only surfaced by collaborators
/// that have no fallback (project-management sync).
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("task {id} not found")]
    NotFound { id: i64 },

    #[error("task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl FocusError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Validation { .. } => "validation_error",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::Configuration(_) => "configuration_error",
            Self::Storage(_) => "storage_error",
        }
    }

    /// What the user can do about it.
    pub fn suggestion(&self) -> String {
        match self {
            Self::NotFound { .. } => {
                "Use get_all_tasks to see the available task ids.".to_string()
            }
            Self::InvalidTransition { id, from, .. } if *from == TaskStatus::Done => format!(
                "Task {id} is already done. Create a new task or start a different one."
            ),
            Self::InvalidTransition { .. } => "Check the task status with get_all_tasks.".to_string(),
            Self::Validation { field, .. } => format!("Provide a valid {field} and try again."),
            Self::BackendUnavailable(_) => {
                "Check the API key and network connection, then retry.".to_string()
            }
            Self::Configuration(_) => "Fix the configuration and restart FocusFlow.".to_string(),
            Self::Storage(_) => "Check that the database file is writable.".to_string(),
        }
    }

    /// Recover a typed error that travelled through an `anyhow` boundary (DB closures).
    pub(crate) fn from_anyhow(err: anyhow::Error) -> Self {
        match err.downcast::<FocusError>() {
            Ok(typed) => typed,
            Err(other) => FocusError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_survive_anyhow_round_trip() {
        let wrapped: anyhow::Error = FocusError::NotFound { id: 7 }.into();
        let recovered = FocusError::from_anyhow(wrapped);
        assert!(matches!(recovered, FocusError::NotFound { id: 7 }));
        assert_eq!(recovered.code(), "not_found");
    }

    #[test]
    fn untyped_errors_become_storage() {
        let recovered = FocusError::from_anyhow(anyhow::anyhow!("disk full"));
        assert_eq!(recovered.code(), "storage_error");
        assert_eq!(recovered.to_string(), "disk full");
    }

    #[test]
    fn done_transition_suggestion_names_the_task() {
        let err = FocusError::InvalidTransition {
            id: 3,
            from: TaskStatus::Done,
            to: TaskStatus::InProgress,
        };
        assert!(err.suggestion().contains("Task 3"));
        assert_eq!(err.to_string(), "task 3 cannot move from Done to In Progress");
    }
}
