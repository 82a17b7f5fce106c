use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};

use focusflow_lib::{
    init_logging, metrics::MetricsWindow, settings::AppConfig, sync::import_project, AppState,
};

#[derive(Parser)]
#[command(name = "focusflow", version, about = "Focus agent for a single active task")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run periodic focus checks until Ctrl-C (demo mode reads activity from stdin)
    Monitor {
        /// Seconds between checks (defaults to the saved preference)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Run a single focus check and print the result
    Check,
    /// Turn a project description into a starter task list
    Onboard {
        description: String,
        /// Replace the existing task list instead of appending
        #[arg(long)]
        replace: bool,
    },
    /// Execute one tool call, e.g. '{"tool":"get_all_tasks"}'
    Tool { request: String },
    /// Read a resource such as focusflow://stats
    Resource { uri: String },
    /// Import open issues from a Linear project (lists projects when no id is given)
    Import { project_id: Option<String> },
    /// Update saved preferences
    Prefs {
        #[arg(long)]
        interval: Option<u64>,
        /// today or all
        #[arg(long)]
        window: Option<String>,
        #[arg(long)]
        voice: Option<bool>,
    },
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    let state = AppState::initialize(config).await?;
    let result = run(&state, cli.cmd).await;
    state.shutdown().await;
    result
}

async fn run(state: &AppState, cmd: Command) -> Result<()> {
    match cmd {
        Command::Monitor { interval } => {
            let interval = interval
                .map(std::time::Duration::from_secs)
                .unwrap_or_else(|| state.check_interval());

            if let Some(handle) = state.manual_text.clone() {
                tokio::spawn(async move {
                    let mut lines = BufReader::new(tokio::io::stdin()).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        handle.set(line);
                    }
                });
            }

            state.monitor.lock().await.start(interval)?;
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            info!("Ctrl-C received, stopping monitor");
            state.monitor.lock().await.stop().await?;
            print_json(&state.monitor.lock().await.status())
        }
        Command::Check => {
            let report = state.monitor.lock().await.check_now().await?;
            print_json(&report)
        }
        Command::Onboard {
            description,
            replace,
        } => {
            let outcome = state
                .onboarding
                .onboard(&state.tasks, &description, replace)
                .await?;
            print_json(&outcome)
        }
        Command::Tool { request } => print_json(&state.tools.call_json(&request).await),
        Command::Resource { uri } => match state.tools.read_resource(&uri).await {
            Ok(value) => print_json(&value),
            Err(failure) => print_json(&serde_json::json!({ "error": failure })),
        },
        Command::Import { project_id: None } => print_json(&state.sync.list_projects().await?),
        Command::Import {
            project_id: Some(project_id),
        } => {
            let tasks = import_project(&state.tasks, state.sync.as_ref(), &project_id).await?;
            print_json(&tasks)
        }
        Command::Prefs {
            interval,
            window,
            voice,
        } => {
            let mut preferences = state.settings.preferences()?;
            if let Some(secs) = interval {
                preferences.check_interval_secs = secs.max(1);
            }
            if let Some(window) = window {
                preferences.metrics_window = MetricsWindow::parse(&window)
                    .with_context(|| format!("unknown metrics window '{window}'"))?;
            }
            if let Some(voice) = voice {
                preferences.voice_enabled = voice;
            }
            state.settings.update(preferences.clone())?;
            print_json(&preferences)
        }
    }
}
