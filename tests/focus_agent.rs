use std::sync::Arc;
use std::time::Duration;

use focusflow_lib::activity::ActivitySnapshot;
use focusflow_lib::agent::{
    select_backend, BackendSource, FocusAgent, HttpBackend, ProviderKind, NO_TASK_MESSAGE,
};
use focusflow_lib::db::models::{Task, Verdict};
use focusflow_lib::db::Database;
use focusflow_lib::settings::AppConfig;
use focusflow_lib::tasks::TaskStore;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn login_task() -> Task {
    let store = TaskStore::new(Database::open_in_memory().unwrap());
    let task = store
        .create("Implement login endpoint", "Password check for the API", 25)
        .await
        .unwrap();
    store.start(task.id).await.unwrap()
}

fn openai_agent(server: &MockServer) -> FocusAgent {
    let backend = HttpBackend::with_base_url(
        ProviderKind::OpenAi,
        "sk-test",
        "gpt-4o",
        server.uri(),
        Duration::from_secs(5),
    )
    .unwrap();
    FocusAgent::new(Arc::new(backend), Duration::from_secs(5))
}

fn completion(content: &str) -> serde_json::Value {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
}

#[tokio::test]
async fn no_active_task_short_circuits_to_idle() {
    let agent = FocusAgent::mock();
    let snapshot = ActivitySnapshot::text("browsing reddit");
    let evaluation = agent.evaluate(None, Some(&snapshot)).await;
    assert_eq!(evaluation.verdict, Verdict::Idle);
    assert_eq!(evaluation.message, NO_TASK_MESSAGE);
    assert_eq!(evaluation.backend, "none");
}

#[tokio::test]
async fn mock_backend_follows_the_keyword_rule() {
    let agent = FocusAgent::mock();
    let task = login_task().await;

    let on_track = agent
        .evaluate(Some(&task), Some(&ActivitySnapshot::text("auth.py: hash the password")))
        .await;
    assert_eq!(on_track.verdict, Verdict::OnTrack);

    let distracted = agent
        .evaluate(Some(&task), Some(&ActivitySnapshot::text("scrolling reddit threads")))
        .await;
    assert_eq!(distracted.verdict, Verdict::Distracted);
    assert!(distracted.message.contains("Implement login endpoint"));

    let idle = agent
        .evaluate(Some(&task), Some(&ActivitySnapshot::text("watered garden plants")))
        .await;
    assert_eq!(idle.verdict, Verdict::Idle);
}

#[tokio::test]
async fn fresh_mock_agents_replay_the_same_verdicts() {
    let task = login_task().await;
    let activity = [
        "auth.py: hash the password",
        "scrolling reddit threads",
        "watered garden plants",
        "session token refresh",
        "youtube music video",
        "",
    ];

    let mut runs = Vec::new();
    for _ in 0..2 {
        let agent = FocusAgent::mock();
        let mut verdicts = Vec::new();
        for text in activity {
            let evaluation = agent
                .evaluate(Some(&task), Some(&ActivitySnapshot::text(text)))
                .await;
            verdicts.push(evaluation.verdict);
        }
        runs.push(verdicts);
    }

    assert_eq!(runs[0], runs[1]);
    assert_eq!(
        runs[0],
        vec![
            Verdict::OnTrack,
            Verdict::Distracted,
            Verdict::Idle,
            Verdict::OnTrack,
            Verdict::Distracted,
            Verdict::Idle,
        ]
    );
}

#[tokio::test]
async fn provider_verdict_and_message_are_used() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "```json\n{\"verdict\": \"Distracted\", \"message\": \"Back to the login flow! 🦉\", \"reasoning\": \"video site\"}\n```",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let task = login_task().await;
    let evaluation = openai_agent(&server)
        .evaluate(Some(&task), Some(&ActivitySnapshot::text("watching a video")))
        .await;

    assert_eq!(evaluation.verdict, Verdict::Distracted);
    assert_eq!(evaluation.message, "Back to the login flow! 🦉");
    assert_eq!(evaluation.backend, "openai");
    assert!(!evaluation.degraded);
}

#[tokio::test]
async fn server_errors_retry_once_then_degrade_to_mock() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "error": { "message": "overloaded" } })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let task = login_task().await;
    let evaluation = openai_agent(&server)
        .evaluate(Some(&task), Some(&ActivitySnapshot::text("auth.py: hash the password")))
        .await;

    assert!(evaluation.degraded);
    assert_eq!(evaluation.backend, "mock");
    assert_eq!(evaluation.verdict, Verdict::OnTrack);
}

#[tokio::test]
async fn auth_failures_degrade_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "bad key" })))
        .expect(1)
        .mount(&server)
        .await;

    let task = login_task().await;
    let evaluation = openai_agent(&server)
        .evaluate(Some(&task), Some(&ActivitySnapshot::text("scrolling reddit threads")))
        .await;

    assert!(evaluation.degraded);
    assert_eq!(evaluation.verdict, Verdict::Distracted);
}

#[tokio::test]
async fn unparseable_answers_degrade() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Looks fine to me!")))
        .expect(1)
        .mount(&server)
        .await;

    let task = login_task().await;
    let evaluation = openai_agent(&server)
        .evaluate(Some(&task), Some(&ActivitySnapshot::text("watered garden plants")))
        .await;

    assert!(evaluation.degraded);
    assert_eq!(evaluation.verdict, Verdict::Idle);
}

#[tokio::test]
async fn slow_backends_time_out_and_degrade() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(r#"{"verdict":"OnTrack"}"#))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let backend = HttpBackend::with_base_url(
        ProviderKind::OpenAi,
        "sk-test",
        "gpt-4o",
        server.uri(),
        Duration::from_secs(5),
    )
    .unwrap();
    let agent = FocusAgent::new(Arc::new(backend), Duration::from_millis(200));

    let task = login_task().await;
    let evaluation = agent
        .evaluate(Some(&task), Some(&ActivitySnapshot::text("scrolling reddit threads")))
        .await;

    assert!(evaluation.degraded);
    assert_eq!(evaluation.verdict, Verdict::Distracted);
}

fn local_config(base_url: &str) -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "AI_PROVIDER" => Some("vllm".to_string()),
        "VLLM_BASE_URL" => Some(base_url.to_string()),
        _ => None,
    })
    .unwrap()
}

#[tokio::test]
async fn reachable_local_server_is_selected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let selection = select_backend(&local_config(&server.uri())).await;
    assert_eq!(selection.source, BackendSource::LocalInference);
}

#[tokio::test]
async fn unreachable_local_server_falls_back_to_mock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let selection = select_backend(&local_config(&server.uri())).await;
    assert_eq!(selection.source, BackendSource::Mock);
    assert_eq!(selection.backend.name(), "mock");
}
