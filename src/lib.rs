pub mod activity;
pub mod agent;
pub mod db;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod onboarding;
pub mod settings;
pub mod sync;
pub mod tasks;
pub mod timer;
pub mod tools;
pub mod utils;
pub mod voice;

use std::{sync::Arc, time::Duration};

use log::{info, warn};
use tokio::sync::Mutex;

use activity::{ActivitySource, FileWatchSource, ManualTextHandle, ManualTextSource};
use agent::{select_backend, BackendSource, FocusAgent};
use db::Database;
use error::{FocusError, FocusResult};
use metrics::MetricsTracker;
use monitor::FocusMonitor;
use onboarding::OnboardingDecomposer;
use settings::{AppConfig, LaunchMode, SettingsStore, UserPreferences};
use sync::{LinearClient, OfflineSync, TaskSync};
use tasks::TaskStore;
use timer::PomodoroTimer;
use tools::ToolSurface;
use voice::{LogSpeech, SilentSpeech, SpeechSink};

/// Everything the binary (or an embedding host) needs, wired once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub settings: SettingsStore,
    pub preferences: UserPreferences,
    pub tasks: TaskStore,
    pub metrics: MetricsTracker,
    pub agent: FocusAgent,
    pub backend_source: BackendSource,
    pub onboarding: OnboardingDecomposer,
    pub timer: PomodoroTimer,
    pub tools: ToolSurface,
    pub sync: Arc<dyn TaskSync>,
    pub monitor: Mutex<FocusMonitor>,
    /// Present when activity is typed rather than watched: demo mode, or a local
    /// launch whose watch root could not be used.
    pub manual_text: Option<ManualTextHandle>,
}

impl AppState {
    pub async fn initialize(config: AppConfig) -> FocusResult<Self> {
        let db = match config.launch_mode {
            LaunchMode::Demo => Database::open_in_memory(),
            LaunchMode::Local => Database::new(config.db_path.clone()),
        }
        .map_err(FocusError::from_anyhow)?;

        let settings_path = config.settings_path();
        let has_saved_preferences = settings_path.exists();
        let settings = SettingsStore::new(settings_path).map_err(FocusError::from_anyhow)?;
        // Saved preferences win over the environment once the user has changed them.
        let preferences = if has_saved_preferences {
            settings.preferences().map_err(FocusError::from_anyhow)?
        } else {
            UserPreferences {
                check_interval_secs: config.check_interval.as_secs(),
                metrics_window: config.metrics_window,
                voice_enabled: config.voice_enabled,
            }
        };

        let selection = select_backend(&config).await;
        let agent = FocusAgent::new(selection.backend, config.backend_timeout);
        let onboarding = OnboardingDecomposer::from_agent(&agent);

        let tasks = TaskStore::new(db.clone());
        let metrics = MetricsTracker::new(db.clone(), preferences.metrics_window);
        let timer = PomodoroTimer::new();
        let tools = ToolSurface::new(tasks.clone(), metrics.clone(), timer.clone());

        let sync: Arc<dyn TaskSync> = match config.linear_api_key.as_deref() {
            Some(key) => Arc::new(LinearClient::new(key, config.backend_timeout)?),
            None => {
                info!("Linear: no API key, using offline projects");
                Arc::new(OfflineSync)
            }
        };

        let mut manual_text = None;
        let watcher = match config.launch_mode {
            LaunchMode::Demo => None,
            LaunchMode::Local => {
                let root = config
                    .watch_dir
                    .clone()
                    .unwrap_or_else(|| std::path::PathBuf::from("."));
                match FileWatchSource::new(root) {
                    Ok(source) => Some(source),
                    Err(err) => {
                        warn!("file watching disabled ({}): {err}", err.code());
                        None
                    }
                }
            }
        };
        let source: Box<dyn ActivitySource> = match watcher {
            Some(source) => Box::new(source),
            None => {
                let (source, handle) = ManualTextSource::new();
                manual_text = Some(handle);
                Box::new(source)
            }
        };

        let speech: Arc<dyn SpeechSink> = if preferences.voice_enabled {
            Arc::new(LogSpeech)
        } else {
            Arc::new(SilentSpeech)
        };
        let monitor = FocusMonitor::new(
            tasks.clone(),
            agent.clone(),
            metrics.clone(),
            source,
            speech,
        );

        info!(
            "FocusFlow ready ({:?} mode, backend {} via {:?})",
            config.launch_mode,
            agent.backend_name(),
            selection.source
        );

        Ok(Self {
            config,
            db,
            settings,
            preferences,
            tasks,
            metrics,
            agent,
            backend_source: selection.source,
            onboarding,
            timer,
            tools,
            sync,
            monitor: Mutex::new(monitor),
            manual_text,
        })
    }

    pub fn check_interval(&self) -> Duration {
        self.preferences.check_interval()
    }

    /// Stops the monitor and releases the activity source. The database worker is
    /// joined when the last handle drops.
    pub async fn shutdown(&self) {
        if let Err(err) = self.monitor.lock().await.shutdown().await {
            warn!("monitor shutdown failed: {err}");
        }
        info!("FocusFlow shut down");
    }
}

/// Reads `RUST_LOG`, defaulting to `info`. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
