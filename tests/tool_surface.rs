use focusflow_lib::db::models::Verdict;
use focusflow_lib::db::Database;
use focusflow_lib::metrics::{MetricsTracker, MetricsWindow};
use focusflow_lib::tasks::TaskStore;
use focusflow_lib::timer::PomodoroTimer;
use focusflow_lib::tools::{ToolCall, ToolSurface, RESOURCE_ACTIVE_TASK, RESOURCE_STATS};
use serde_json::json;

fn surface() -> (ToolSurface, MetricsTracker) {
    let db = Database::open_in_memory().unwrap();
    let metrics = MetricsTracker::new(db.clone(), MetricsWindow::Today);
    let tools = ToolSurface::new(TaskStore::new(db), metrics.clone(), PomodoroTimer::new());
    (tools, metrics)
}

#[tokio::test]
async fn task_tools_round_trip_through_json() {
    let (tools, _) = surface();

    let created = tools
        .call_json(r#"{"tool":"add_task","args":{"title":"Write README","duration":20}}"#)
        .await;
    assert_eq!(created["title"], "Write README");
    assert_eq!(created["estimatedDuration"], 20);
    assert_eq!(created["status"], "todo");
    let id = created["id"].as_i64().unwrap();

    let current = tools.call(ToolCall::GetCurrentTask).await.unwrap();
    assert_eq!(current, json!({ "active": null }));

    tools.call(ToolCall::StartTask { task_id: id }).await.unwrap();
    let active = tools.read_resource(RESOURCE_ACTIVE_TASK).await.unwrap();
    assert_eq!(active["active"]["id"], id);

    let done = tools.call(ToolCall::MarkTaskDone { task_id: id }).await.unwrap();
    assert_eq!(done["status"], "done");

    let deleted = tools.call(ToolCall::DeleteTask { task_id: id }).await.unwrap();
    assert_eq!(deleted, json!({ "deleted": id }));
    assert_eq!(tools.call(ToolCall::GetAllTasks).await.unwrap(), json!([]));
}

#[tokio::test]
async fn missing_tasks_fail_with_a_marker_and_suggestion() {
    let (tools, _) = surface();

    let failure = tools.call(ToolCall::StartTask { task_id: 99 }).await.unwrap_err();
    assert_eq!(failure.marker, "❌");
    assert_eq!(failure.code, "not_found");
    assert_eq!(failure.message, "task 99 not found");
    assert!(failure.suggestion.contains("get_all_tasks"));

    let rendered = tools
        .call_json(r#"{"tool":"mark_task_done","args":{"task_id":99}}"#)
        .await;
    assert_eq!(rendered["error"]["code"], "not_found");
}

#[tokio::test]
async fn invalid_input_is_reported_not_thrown() {
    let (tools, _) = surface();

    let blank = tools
        .call(ToolCall::AddTask {
            title: "  ".into(),
            description: String::new(),
            duration: 30,
        })
        .await
        .unwrap_err();
    assert_eq!(blank.code, "validation_error");

    let garbage = tools.call_json("not json").await;
    assert_eq!(garbage["error"]["code"], "invalid_request");

    let unknown = tools.read_resource("focusflow://nope").await.unwrap_err();
    assert_eq!(unknown.code, "unknown_resource");
}

#[tokio::test]
async fn update_task_edits_fields() {
    let (tools, _) = surface();
    let created = tools
        .call(ToolCall::AddTask {
            title: "Sketch".into(),
            description: String::new(),
            duration: 30,
        })
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();

    let updated = tools
        .call_json(&format!(
            r#"{{"tool":"update_task","args":{{"task_id":{id},"title":"Sketch UI","duration":15}}}}"#
        ))
        .await;
    assert_eq!(updated["title"], "Sketch UI");
    assert_eq!(updated["estimatedDuration"], 15);
}

#[tokio::test]
async fn stats_combine_metrics_and_task_summary() {
    let (tools, metrics) = surface();
    tools
        .call(ToolCall::AddTask {
            title: "One".into(),
            description: String::new(),
            duration: 30,
        })
        .await
        .unwrap();
    metrics.record(Verdict::OnTrack, None, "good").await.unwrap();
    metrics.record(Verdict::Distracted, None, "bad").await.unwrap();
    metrics.record(Verdict::OnTrack, None, "good").await.unwrap();

    let stats = tools.read_resource(RESOURCE_STATS).await.unwrap();
    assert_eq!(stats["metrics"]["totalChecks"], 3);
    assert_eq!(stats["metrics"]["focusScore"], 67);
    assert_eq!(stats["metrics"]["currentStreak"], 1);
    assert_eq!(stats["tasks"]["total"], 1);
}

#[tokio::test]
async fn pomodoro_tools_report_status() {
    let (tools, _) = surface();
    let started = tools.call(ToolCall::PomodoroStart).await.unwrap();
    assert_eq!(started["running"], true);
    assert_eq!(started["phase"], "work");

    let paused = tools.call_json(r#"{"tool":"pomodoro_pause"}"#).await;
    assert_eq!(paused["running"], false);

    let reset = tools.call(ToolCall::PomodoroReset).await.unwrap();
    assert_eq!(reset["display"], "25:00");
}

#[tokio::test]
async fn argument_free_tools_accept_empty_args() {
    let (tools, _) = surface();
    tools
        .call_json(r#"{"tool":"add_task","args":{"title":"Plan sprint"}}"#)
        .await;

    let all = tools.call_json(r#"{"tool":"get_all_tasks","args":{}}"#).await;
    assert_eq!(all.as_array().map(Vec::len), Some(1));

    let current = tools
        .call_json(r#"{"tool":"get_current_task","args":{}}"#)
        .await;
    assert_eq!(current, json!({ "active": null }));

    let stats = tools
        .call_json(r#"{"tool":"get_productivity_stats","args":{}}"#)
        .await;
    assert_eq!(stats["tasks"]["total"], 1);

    for tool in ["pomodoro_start", "pomodoro_pause", "pomodoro_reset", "pomodoro_status"] {
        let answer = tools
            .call_json(&format!(r#"{{"tool":"{tool}","args":{{}}}}"#))
            .await;
        assert!(answer.get("error").is_none(), "{tool} failed: {answer}");
        assert_eq!(answer["phase"], "work");
    }
}
