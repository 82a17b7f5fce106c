//! One-time backend choice at startup.
//!
//! Priority: shared demo credential, then the user's own credential for the
//! configured provider, then a reachable local OpenAI-compatible server, then the mock.

use std::{sync::Arc, time::Duration};

use log::{info, warn};
use serde::Serialize;

use super::backend::Backend;
use super::mock::MockBackend;
use super::providers::{HttpBackend, ProviderKind};
use crate::settings::{AiProvider, AppConfig, LocalInferenceConfig};

const LOCAL_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BackendSource {
    DemoCredential,
    UserCredential,
    LocalInference,
    Mock,
}

#[derive(Clone)]
pub struct BackendSelection {
    pub backend: Arc<dyn Backend>,
    pub source: BackendSource,
}

impl BackendSelection {
    pub fn mock() -> Self {
        Self {
            backend: Arc::new(MockBackend::new()),
            source: BackendSource::Mock,
        }
    }
}

fn hosted_kind(provider: AiProvider) -> Option<ProviderKind> {
    match provider {
        AiProvider::OpenAi => Some(ProviderKind::OpenAi),
        AiProvider::Anthropic => Some(ProviderKind::Anthropic),
        AiProvider::Gemini => Some(ProviderKind::Gemini),
        AiProvider::Vllm | AiProvider::Mock => None,
    }
}

pub async fn select_backend(config: &AppConfig) -> BackendSelection {
    if config.provider == AiProvider::Mock {
        info!("AI backend: mock (requested)");
        return BackendSelection::mock();
    }

    if let Some(kind) = hosted_kind(config.provider) {
        let model = config
            .credentials
            .model
            .clone()
            .unwrap_or_else(|| config.provider.default_model().to_string());

        let candidates = [
            (config.credentials.demo_api_key.as_deref(), BackendSource::DemoCredential),
            (config.credentials.api_key.as_deref(), BackendSource::UserCredential),
        ];
        for (key, source) in candidates {
            let Some(key) = key else { continue };
            match HttpBackend::new(kind, key, model.clone(), config.backend_timeout) {
                Ok(backend) => {
                    info!("AI backend: {} ({model}) via {source:?}", kind.name());
                    return BackendSelection {
                        backend: Arc::new(backend),
                        source,
                    };
                }
                Err(err) => warn!("ignoring {source:?} for {}: {err}", kind.name()),
            }
        }
    }

    if probe_local(&config.local).await {
        match HttpBackend::with_base_url(
            ProviderKind::Local,
            &config.local.api_key,
            config.local.model.clone(),
            config.local.base_url.clone(),
            config.backend_timeout,
        ) {
            Ok(backend) => {
                info!(
                    "AI backend: local inference at {} ({})",
                    config.local.base_url, config.local.model
                );
                return BackendSelection {
                    backend: Arc::new(backend),
                    source: BackendSource::LocalInference,
                };
            }
            Err(err) => warn!("local inference server unusable: {err}"),
        }
    } else {
        warn!(
            "local inference server at {} is unreachable",
            config.local.base_url
        );
    }

    info!("AI backend: mock (no credentials or local server available)");
    BackendSelection::mock()
}

/// `GET {base}/models` answered with a success status within two seconds.
pub async fn probe_local(local: &LocalInferenceConfig) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(LOCAL_PROBE_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            warn!("cannot build probe client: {err}");
            return false;
        }
    };

    match client
        .get(format!("{}/models", local.base_url.trim_end_matches('/')))
        .bearer_auth(&local.api_key)
        .send()
        .await
    {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}
