use serde::Serialize;

use crate::error::FocusError;

pub const FAILURE_MARKER: &str = "❌";

/// Error shape returned to tool callers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolFailure {
    pub marker: &'static str,
    pub code: &'static str,
    pub message: String,
    pub suggestion: String,
}

impl ToolFailure {
    pub fn new(code: &'static str, message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            marker: FAILURE_MARKER,
            code,
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(
            "invalid_request",
            message,
            "Send {\"tool\": <name>, \"args\": {...}} with one of the listed tool names.",
        )
    }

    pub fn unknown_resource(uri: &str) -> Self {
        Self::new(
            "unknown_resource",
            format!("resource {uri} does not exist"),
            "Use focusflow://tasks/all, focusflow://tasks/active or focusflow://stats.",
        )
    }
}

impl From<FocusError> for ToolFailure {
    fn from(err: FocusError) -> Self {
        Self::new(err.code(), err.to_string(), err.suggestion())
    }
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.marker, self.message, self.suggestion)
    }
}
