use std::time::Duration;

use focusflow_lib::db::models::TaskDraft;
use focusflow_lib::db::Database;
use focusflow_lib::error::FocusError;
use focusflow_lib::sync::{import_project, LinearClient, OfflineSync, TaskSync};
use focusflow_lib::tasks::TaskStore;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> LinearClient {
    LinearClient::with_endpoint(
        "lin_api_test",
        format!("{}/graphql", server.uri()),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn projects_are_read_from_the_viewer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", "lin_api_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "viewer": { "projects": { "nodes": [
                { "id": "p1", "name": "Launch", "description": null }
            ] } } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let projects = client(&server).list_projects().await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id, "p1");
    assert_eq!(projects[0].description, None);
}

#[tokio::test]
async fn importing_a_project_creates_tasks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("projectId"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "project": { "issues": { "nodes": [
                { "id": "ENG-1", "title": "Wire up OAuth", "description": "GitHub provider", "estimate": 3 },
                { "id": "ENG-2", "title": "Rate limit login", "description": null, "estimate": 0 },
                { "id": "ENG-3", "title": "   ", "description": null, "estimate": null }
            ] } } }
        })))
        .mount(&server)
        .await;

    let store = TaskStore::new(Database::open_in_memory().unwrap());
    let tasks = import_project(&store, &client(&server), "p1").await.unwrap();

    let summary: Vec<_> = tasks
        .iter()
        .map(|t| (t.title.as_str(), t.estimated_duration))
        .collect();
    assert_eq!(summary, vec![("Wire up OAuth", 3), ("Rate limit login", 1)]);
    assert_eq!(store.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn graphql_errors_are_backend_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "Authentication required" }]
        })))
        .mount(&server)
        .await;

    let err = client(&server).list_projects().await.unwrap_err();
    assert!(matches!(err, FocusError::BackendUnavailable(ref m) if m.contains("Authentication required")));
    assert_eq!(err.code(), "backend_unavailable");
}

#[tokio::test]
async fn http_failures_are_backend_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_task(&TaskDraft::new("New", "", 10))
        .await
        .unwrap_err();
    assert!(matches!(err, FocusError::BackendUnavailable(_)));
}

#[tokio::test]
async fn create_task_uses_the_first_team() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("teams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "viewer": { "teams": { "nodes": [{ "id": "team-1" }] } } }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("team-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "issueCreate": { "issue": { "id": "ENG-9" } } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server)
        .create_task(&TaskDraft::new("Write changelog", "", 20))
        .await
        .unwrap();
    assert_eq!(id, "ENG-9");
}

#[tokio::test]
async fn offline_import_uses_canned_projects() {
    let store = TaskStore::new(Database::open_in_memory().unwrap());
    let tasks = import_project(&store, &OfflineSync, "mock-2").await.unwrap();
    let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Setup Repo", "Basic Auth"]);
}
