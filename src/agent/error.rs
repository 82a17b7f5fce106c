//! Failures of a single backend call.
//!
//! These never escape the agent or the decomposer: every variant degrades the
//! current call to the mock judgement.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} error ({status}): {message}")]
    Provider {
        provider: &'static str,
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("{0} rejected the credentials")]
    Auth(&'static str),

    #[error("{0} quota exceeded")]
    QuotaExceeded(&'static str),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl BackendError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Timeouts, connection failures and 5xx responses.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Provider { retryable, .. } => *retryable,
            Self::Auth(_) => false,
            Self::QuotaExceeded(_) => false,
            Self::MalformedResponse(_) => false,
            Self::Config(_) => false,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Http(_) => "http_error",
            Self::Provider { .. } => "provider_error",
            Self::Auth(_) => "auth_error",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Config(_) => "config_error",
        }
    }

    /// Maps a non-success HTTP status to the matching variant.
    pub fn from_status(provider: &'static str, status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::Auth(provider),
            429 => Self::QuotaExceeded(provider),
            _ => Self::Provider {
                provider,
                status,
                message: message.into(),
                retryable: status >= 500,
            },
        }
    }
}
