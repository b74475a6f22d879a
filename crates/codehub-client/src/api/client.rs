//! reqwest-backed client for the CodeHub REST API.

use std::sync::Arc;
use std::time::Duration;

use codehub_common::constants::api_paths;
use codehub_common::{
    Challenge, LoginRequest, NewTask, ProjectId, Session, StatusUpdate, Task, TaskId, TaskPatch,
    TaskStatus,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use super::{AuthService, ChallengeService, TaskService, TransportError};
use crate::config::ApiConfig;

/// HTTP client for the CodeHub API
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    /// Bearer token of the current session, if logged in
    access_token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("codehub/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Network(format!("build client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Attach (or clear) the bearer token used on subsequent requests
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.access_token.read().await.is_some()
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match self.access_token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response, TransportError> {
        let resp = builder.send().await.map_err(|e| {
            tracing::warn!(operation = what, error = %e, "Request failed");
            TransportError::Network(format!("{what}: {e}"))
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = extract_error_message(&body);
        tracing::warn!(
            operation = what,
            status = status.as_u16(),
            message = %message,
            "Request rejected"
        );
        Err(TransportError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, TransportError> {
        let resp = self.send(builder, what).await?;
        resp.json::<T>()
            .await
            .map_err(|e| TransportError::Decode(format!("{what}: {e}")))
    }
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"error": ".."}`, `{"detail": ".."}`, or falls back to the raw text.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "detail", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    body.trim().to_string()
}

fn project_tasks_path(project: ProjectId) -> String {
    format!("{}{}/tasks", api_paths::PROJECTS_PREFIX, project)
}

fn task_path(id: TaskId) -> String {
    format!("{}{}", api_paths::TASKS_PREFIX, id)
}

impl ChallengeService for ApiClient {
    async fn issue_challenge(&self) -> Result<Challenge, TransportError> {
        let req = self.request(Method::GET, api_paths::CAPTCHA).await;
        self.send_json(req, "issue challenge").await
    }
}

impl AuthService for ApiClient {
    async fn verify_login(&self, request: &LoginRequest) -> Result<Session, TransportError> {
        let req = self.request(Method::POST, api_paths::LOGIN).await.json(request);
        let session: Session = self.send_json(req, "login").await?;
        self.set_access_token(Some(session.access_token.clone())).await;
        tracing::info!(user = %session.user.username, "Logged in");
        Ok(session)
    }
}

impl TaskService for ApiClient {
    async fn list_tasks(&self, project: ProjectId) -> Result<Vec<Task>, TransportError> {
        let req = self.request(Method::GET, &project_tasks_path(project)).await;
        self.send_json(req, "list tasks").await
    }

    async fn create_task(&self, project: ProjectId, fields: &NewTask) -> Result<Task, TransportError> {
        let req = self
            .request(Method::POST, &project_tasks_path(project))
            .await
            .json(fields);
        self.send_json(req, "create task").await
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, TransportError> {
        let req = self.request(Method::PATCH, &task_path(id)).await.json(patch);
        self.send_json(req, "update task").await
    }

    async fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<Task, TransportError> {
        let path = format!("{}/status", task_path(id));
        let req = self
            .request(Method::PATCH, &path)
            .await
            .json(&StatusUpdate { status });
        self.send_json(req, "update task status").await
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), TransportError> {
        let req = self.request(Method::DELETE, &task_path(id)).await;
        self.send(req, "delete task").await?;
        Ok(())
    }
}
