use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{FocusError, FocusResult};
use crate::metrics::MetricsWindow;

const DEFAULT_DB_PATH: &str = "focusflow.db";
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 30;
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 12;
const DEFAULT_VLLM_BASE_URL: &str = "http://localhost:8000/v1";
const DEFAULT_VLLM_MODEL: &str = "ibm-granite/granite-4.0-h-1b";
const DEFAULT_VLLM_API_KEY: &str = "EMPTY";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LaunchMode {
    /// In-memory store, manual text activity.
    Demo,
    /// SQLite file, file-watch activity.
    Local,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AiProvider {
    OpenAi,
    Anthropic,
    Gemini,
    Vllm,
    Mock,
}

impl AiProvider {
    /// Prefix of the provider's credential variables (`<P>_API_KEY`).
    pub fn env_prefix(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "OPENAI",
            AiProvider::Anthropic => "ANTHROPIC",
            AiProvider::Gemini => "GEMINI",
            AiProvider::Vllm => "VLLM",
            AiProvider::Mock => "MOCK",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "gpt-4o",
            AiProvider::Anthropic => "claude-3-5-sonnet-20241022",
            AiProvider::Gemini => "gemini-2.0-flash",
            AiProvider::Vllm => DEFAULT_VLLM_MODEL,
            AiProvider::Mock => "mock",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(AiProvider::OpenAi),
            "anthropic" | "claude" => Some(AiProvider::Anthropic),
            "gemini" | "google" => Some(AiProvider::Gemini),
            "vllm" | "local" => Some(AiProvider::Vllm),
            "mock" => Some(AiProvider::Mock),
            _ => None,
        }
    }
}

/// Credentials resolved for the configured hosted provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub demo_api_key: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInferenceConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub launch_mode: LaunchMode,
    pub db_path: PathBuf,
    pub watch_dir: Option<PathBuf>,
    pub check_interval: Duration,
    pub metrics_window: MetricsWindow,
    pub provider: AiProvider,
    pub credentials: ProviderCredentials,
    pub local: LocalInferenceConfig,
    pub backend_timeout: Duration,
    pub linear_api_key: Option<String>,
    pub voice_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            launch_mode: LaunchMode::Local,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            watch_dir: None,
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            metrics_window: MetricsWindow::Today,
            provider: AiProvider::OpenAi,
            credentials: ProviderCredentials::default(),
            local: LocalInferenceConfig {
                base_url: DEFAULT_VLLM_BASE_URL.to_string(),
                model: DEFAULT_VLLM_MODEL.to_string(),
                api_key: DEFAULT_VLLM_API_KEY.to_string(),
            },
            backend_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
            linear_api_key: None,
            voice_enabled: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> FocusResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> FocusResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = AppConfig::default();

        if let Some(mode) = get("LAUNCH_MODE") {
            config.launch_mode = match mode.to_ascii_lowercase().as_str() {
                "demo" => LaunchMode::Demo,
                "local" => LaunchMode::Local,
                other => {
                    return Err(FocusError::configuration(format!(
                        "LAUNCH_MODE must be 'demo' or 'local', got '{other}'"
                    )))
                }
            };
        }

        if let Some(path) = get("FOCUSFLOW_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        config.watch_dir = get("FOCUSFLOW_WATCH_DIR").map(PathBuf::from);

        if let Some(secs) = get("FOCUSFLOW_CHECK_INTERVAL_SECS") {
            config.check_interval = parse_secs("FOCUSFLOW_CHECK_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = get("FOCUSFLOW_BACKEND_TIMEOUT_SECS") {
            config.backend_timeout = parse_secs("FOCUSFLOW_BACKEND_TIMEOUT_SECS", &secs)?;
        }

        if let Some(window) = get("FOCUSFLOW_METRICS_WINDOW") {
            config.metrics_window = MetricsWindow::parse(&window).ok_or_else(|| {
                FocusError::configuration(format!(
                    "FOCUSFLOW_METRICS_WINDOW must be 'today' or 'all', got '{window}'"
                ))
            })?;
        }

        if let Some(provider) = get("AI_PROVIDER") {
            config.provider = AiProvider::parse(&provider).ok_or_else(|| {
                FocusError::configuration(format!("unsupported AI_PROVIDER '{provider}'"))
            })?;
        }

        let prefix = config.provider.env_prefix();
        config.credentials = ProviderCredentials {
            demo_api_key: get(&format!("DEMO_{prefix}_API_KEY")),
            api_key: get(&format!("{prefix}_API_KEY")),
            model: get(&format!("{prefix}_MODEL")),
        };

        if let Some(base_url) = get("VLLM_BASE_URL") {
            config.local.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("VLLM_MODEL") {
            config.local.model = model;
        }
        if let Some(api_key) = get("VLLM_API_KEY") {
            config.local.api_key = api_key;
        }

        config.linear_api_key = get("LINEAR_API_KEY");
        config.voice_enabled = get("VOICE_ENABLED")
            .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Ok(config)
    }

    /// Preferences live next to the database file.
    pub fn settings_path(&self) -> PathBuf {
        let dir = self
            .db_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        dir.join("focusflow-settings.json")
    }
}

fn parse_secs(key: &str, value: &str) -> FocusResult<Duration> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(FocusError::configuration(format!(
            "{key} must be a positive number of seconds, got '{value}'"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub check_interval_secs: u64,
    pub metrics_window: MetricsWindow,
    pub voice_enabled: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            metrics_window: MetricsWindow::Today,
            voice_enabled: false,
        }
    }
}

impl UserPreferences {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserPreferences>,
}

impl SettingsStore {
    /// Loads preferences from `path`; a missing or unreadable file yields defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserPreferences::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn preferences(&self) -> Result<UserPreferences> {
        let guard = self
            .data
            .read()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        Ok(guard.clone())
    }

    pub fn update(&self, preferences: UserPreferences) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        self.persist(&preferences)?;
        *guard = preferences;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &UserPreferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory {}", parent.display())
                })?;
            }
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
