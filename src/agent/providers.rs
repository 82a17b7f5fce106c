//! Hosted and local LLM adapters.
//!
//! All four share one HTTP client shape; only the wire format differs per
//! [`ProviderKind`]. The local variant speaks the OpenAI chat-completions format.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};

use super::backend::{Backend, BackendJudgement};
use super::error::BackendError;
use super::extract::{parse_drafts, parse_judgement};
use super::prompts::{decomposition_prompt, evaluation_prompt};
use crate::db::models::{Task, TaskDraft};

/// Maximum response body we are willing to parse (256 KiB).
const MAX_RESPONSE_LEN: usize = 256 * 1024;
const TEMPERATURE: f32 = 0.7;
const EVALUATION_MAX_TOKENS: u32 = 300;
const DECOMPOSITION_MAX_TOKENS: u32 = 800;
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    /// Self-hosted OpenAI-compatible server (vLLM, llama.cpp, ...).
    Local,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Local => "local",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::Local => "http://localhost:8000/v1",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    kind: ProviderKind,
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl HttpBackend {
    pub fn new(
        kind: ProviderKind,
        api_key: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Self::with_base_url(kind, api_key, model, kind.default_base_url(), timeout)
    }

    pub fn with_base_url(
        kind: ProviderKind,
        api_key: &str,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let key = HeaderValue::from_str(api_key)
            .map_err(|_| BackendError::config("invalid API key format"))?;
        match kind {
            ProviderKind::OpenAi | ProviderKind::Local => {
                let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
                    .map_err(|_| BackendError::config("invalid API key format"))?;
                headers.insert(AUTHORIZATION, bearer);
            }
            ProviderKind::Anthropic => {
                headers.insert(HeaderName::from_static("x-api-key"), key);
                headers.insert(
                    HeaderName::from_static("anthropic-version"),
                    HeaderValue::from_static(ANTHROPIC_VERSION),
                );
            }
            ProviderKind::Gemini => {
                headers.insert(HeaderName::from_static("x-goog-api-key"), key);
            }
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| BackendError::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            kind,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt: &str, max_tokens: u32) -> (String, Value) {
        match self.kind {
            ProviderKind::OpenAi | ProviderKind::Local => (
                format!("{}/chat/completions", self.base_url),
                json!({
                    "model": self.model,
                    "messages": [{ "role": "user", "content": prompt }],
                    "temperature": TEMPERATURE,
                    "max_tokens": max_tokens,
                }),
            ),
            ProviderKind::Anthropic => (
                format!("{}/messages", self.base_url),
                json!({
                    "model": self.model,
                    "max_tokens": max_tokens,
                    "temperature": TEMPERATURE,
                    "messages": [{ "role": "user", "content": prompt }],
                }),
            ),
            ProviderKind::Gemini => (
                format!("{}/models/{}:generateContent", self.base_url, self.model),
                json!({
                    "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
                    "generationConfig": {
                        "temperature": TEMPERATURE,
                        "maxOutputTokens": max_tokens,
                    },
                }),
            ),
        }
    }

    /// Sends one prompt and returns the model's text.
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, BackendError> {
        let provider = self.kind.name();
        let (url, body) = self.request(prompt, max_tokens);

        let mut response = self.client.post(url).json(&body).send().await?;
        let status = response.status();

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > MAX_RESPONSE_LEN {
                return Err(BackendError::malformed(format!(
                    "{provider} response exceeds {MAX_RESPONSE_LEN} bytes"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        let body = String::from_utf8_lossy(&bytes);

        if !status.is_success() {
            return Err(BackendError::from_status(
                provider,
                status.as_u16(),
                error_message(&body).unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            ));
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| BackendError::malformed(format!("{provider} returned invalid JSON: {e}")))?;

        let text = match self.kind {
            ProviderKind::OpenAi | ProviderKind::Local => {
                parsed.pointer("/choices/0/message/content")
            }
            ProviderKind::Anthropic => parsed.pointer("/content/0/text"),
            ProviderKind::Gemini => parsed.pointer("/candidates/0/content/parts/0/text"),
        }
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| BackendError::malformed(format!("{provider} response has no text")))?;

        Ok(text.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed { message: Option<String> },
    Plain(String),
}

fn error_message(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    match envelope.error? {
        ErrorBody::Detailed { message } => message,
        ErrorBody::Plain(message) => Some(message),
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    async fn evaluate(&self, task: &Task, content: &str) -> Result<BackendJudgement, BackendError> {
        let text = self
            .complete(&evaluation_prompt(task, content), EVALUATION_MAX_TOKENS)
            .await?;
        parse_judgement(&text)
    }

    async fn decompose(&self, description: &str) -> Result<Vec<TaskDraft>, BackendError> {
        let text = self
            .complete(&decomposition_prompt(description), DECOMPOSITION_MAX_TOKENS)
            .await?;
        parse_drafts(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_come_from_either_shape() {
        assert_eq!(
            error_message(r#"{"error":{"message":"bad key","type":"auth"}}"#).as_deref(),
            Some("bad key")
        );
        assert_eq!(error_message(r#"{"error":"overloaded"}"#).as_deref(), Some("overloaded"));
        assert_eq!(error_message("<html>"), None);
    }

    #[test]
    fn gemini_url_embeds_the_model() {
        let backend = HttpBackend::with_base_url(
            ProviderKind::Gemini,
            "key",
            "gemini-2.0-flash",
            "http://example.test/v1beta/",
            Duration::from_secs(1),
        )
        .unwrap();
        let (url, body) = backend.request("hi", 10);
        assert_eq!(url, "http://example.test/v1beta/models/gemini-2.0-flash:generateContent");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
    }
}
