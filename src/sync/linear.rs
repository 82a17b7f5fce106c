use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{RemoteIssue, RemoteProject, TaskSync};
use crate::db::models::TaskDraft;
use crate::error::{FocusError, FocusResult};

pub const LINEAR_API_URL: &str = "https://api.linear.app/graphql";

const PROJECTS_QUERY: &str = r#"
query {
    viewer {
        projects(first: 10) {
            nodes { id name description }
        }
    }
}"#;

const ISSUES_QUERY: &str = r#"
query($projectId: String!) {
    project(id: $projectId) {
        issues(first: 20, filter: { state: { name: { neq: "Done" } } }) {
            nodes { id title description estimate }
        }
    }
}"#;

const TEAM_QUERY: &str = "query { viewer { teams(first: 1) { nodes { id } } } }";

const CREATE_ISSUE_MUTATION: &str = r#"
mutation($title: String!, $description: String, $teamId: String!) {
    issueCreate(input: { title: $title, description: $description, teamId: $teamId }) {
        issue { id }
    }
}"#;

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

fn unavailable(message: impl Into<String>) -> FocusError {
    FocusError::BackendUnavailable(format!("linear: {}", message.into()))
}

/// Linear GraphQL client. The API key goes into `Authorization` as-is.
#[derive(Debug, Clone)]
pub struct LinearClient {
    client: reqwest::Client,
    endpoint: String,
}

impl LinearClient {
    pub fn new(api_key: &str, timeout: Duration) -> FocusResult<Self> {
        Self::with_endpoint(api_key, LINEAR_API_URL, timeout)
    }

    pub fn with_endpoint(
        api_key: &str,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> FocusResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(api_key)
                .map_err(|_| FocusError::configuration("invalid LINEAR_API_KEY format"))?,
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| FocusError::configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn query(&self, query: &str, variables: Value) -> FocusResult<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {}", status.as_u16())));
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("invalid response: {e}")))?;
        if let Some(first) = body.errors.first() {
            warn!("Linear returned {} GraphQL errors", body.errors.len());
            return Err(unavailable(first.message.clone()));
        }
        body.data.ok_or_else(|| unavailable("response has no data"))
    }

    async fn field<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
        pointer: &str,
    ) -> FocusResult<T> {
        let data = self.query(query, variables).await?;
        let value = data
            .pointer(pointer)
            .cloned()
            .ok_or_else(|| unavailable(format!("response is missing {pointer}")))?;
        serde_json::from_value(value).map_err(|e| unavailable(format!("unexpected {pointer}: {e}")))
    }

    async fn default_team(&self) -> FocusResult<String> {
        let teams: Nodes<IdOnly> = self
            .field(TEAM_QUERY, json!({}), "/viewer/teams")
            .await?;
        teams
            .nodes
            .into_iter()
            .next()
            .map(|team| team.id)
            .ok_or_else(|| unavailable("account has no teams"))
    }
}

#[async_trait]
impl TaskSync for LinearClient {
    fn name(&self) -> &'static str {
        "linear"
    }

    async fn list_projects(&self) -> FocusResult<Vec<RemoteProject>> {
        let projects: Nodes<RemoteProject> = self
            .field(PROJECTS_QUERY, json!({}), "/viewer/projects")
            .await?;
        Ok(projects.nodes)
    }

    async fn list_project_issues(&self, project_id: &str) -> FocusResult<Vec<RemoteIssue>> {
        let issues: Nodes<RemoteIssue> = self
            .field(
                ISSUES_QUERY,
                json!({ "projectId": project_id }),
                "/project/issues",
            )
            .await?;
        Ok(issues.nodes)
    }

    async fn create_task(&self, draft: &TaskDraft) -> FocusResult<String> {
        let team_id = self.default_team().await?;
        let created: IdOnly = self
            .field(
                CREATE_ISSUE_MUTATION,
                json!({
                    "title": draft.title,
                    "description": draft.description,
                    "teamId": team_id,
                }),
                "/issueCreate/issue",
            )
            .await?;
        Ok(created.id)
    }
}
