use std::collections::HashMap;

use focusflow_lib::agent::BackendSource;
use focusflow_lib::db::models::Verdict;
use focusflow_lib::metrics::MetricsWindow;
use focusflow_lib::settings::{AppConfig, LaunchMode};
use focusflow_lib::AppState;

fn demo_config(dir: &tempfile::TempDir) -> AppConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("LAUNCH_MODE", "demo".to_string()),
        ("AI_PROVIDER", "mock".to_string()),
        (
            "FOCUSFLOW_DB_PATH",
            dir.path().join("focusflow.db").display().to_string(),
        ),
        ("FOCUSFLOW_CHECK_INTERVAL_SECS", "5".to_string()),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

#[tokio::test]
async fn demo_mode_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::initialize(demo_config(&dir)).await.unwrap();
    assert_eq!(state.config.launch_mode, LaunchMode::Demo);
    assert_eq!(state.backend_source, BackendSource::Mock);
    assert_eq!(state.check_interval().as_secs(), 5);
    // Demo mode keeps the database in memory.
    assert!(state.db.path().is_none());

    let outcome = state
        .onboarding
        .onboard(&state.tasks, "A snake game", false)
        .await
        .unwrap();
    let first = &outcome.tasks[0];
    state
        .tools
        .call_json(&format!(r#"{{"tool":"start_task","args":{{"task_id":{}}}}}"#, first.id))
        .await;

    let handle = state.manual_text.clone().expect("demo mode has a text handle");
    handle.set("moved the player sprite and fixed collision");
    let report = state.monitor.lock().await.check_now().await.unwrap();
    assert_eq!(report.evaluation.verdict, Verdict::OnTrack);
    assert_eq!(report.check.task_id, Some(first.id));

    let stats = state.tools.read_resource("focusflow://stats").await.unwrap();
    assert_eq!(stats["metrics"]["totalChecks"], 1);
    assert_eq!(stats["tasks"]["inProgress"], 1);

    state.shutdown().await;
}

#[tokio::test]
async fn saved_preferences_override_the_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config = demo_config(&dir);
    std::fs::write(
        config.settings_path(),
        r#"{"checkIntervalSecs": 90, "metricsWindow": "allTime", "voiceEnabled": false}"#,
    )
    .unwrap();

    let state = AppState::initialize(config).await.unwrap();
    assert_eq!(state.check_interval().as_secs(), 90);
    assert_eq!(state.metrics.default_window(), MetricsWindow::AllTime);
    state.shutdown().await;
}

#[tokio::test]
async fn unusable_watch_root_falls_back_to_typed_activity() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let vars: HashMap<&str, String> = HashMap::from([
        ("LAUNCH_MODE", "local".to_string()),
        ("AI_PROVIDER", "mock".to_string()),
        (
            "FOCUSFLOW_DB_PATH",
            dir.path().join("focusflow.db").display().to_string(),
        ),
        ("FOCUSFLOW_WATCH_DIR", missing.display().to_string()),
    ]);
    let config = AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();

    let state = AppState::initialize(config).await.unwrap();
    assert_eq!(state.config.launch_mode, LaunchMode::Local);
    assert!(state.db.path().is_some());

    let added = state
        .tools
        .call_json(r#"{"tool":"add_task","args":{"title":"Write changelog"}}"#)
        .await;
    let id = added["id"].as_i64().unwrap();
    state.tasks.start(id).await.unwrap();

    let handle = state
        .manual_text
        .clone()
        .expect("fallback source takes typed activity");
    handle.set("drafting the changelog entries");
    let report = state.monitor.lock().await.check_now().await.unwrap();
    assert_eq!(report.check.task_id, Some(id));

    state.shutdown().await;
}
