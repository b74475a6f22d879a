//! External service contracts and the REST client implementing them.
//!
//! The widget and the board only see the traits below; `ApiClient` talks
//! HTTP/JSON to the CodeHub API, tests substitute scripted fakes.

mod client;

pub use client::ApiClient;

use std::future::Future;

use codehub_common::{
    Challenge, CodehubError, LoginRequest, NewTask, ProjectId, Session, Task, TaskId, TaskPatch,
    TaskStatus,
};
use thiserror::Error;

/// Failure talking to an external service
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, timed out, DNS failure...
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Short message suitable for a user-facing notice
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Could not reach the server. Check your connection.".to_string(),
            Self::Status { status, message } if message.is_empty() => {
                format!("The server rejected the request ({status}).")
            }
            Self::Status { message, .. } => message.clone(),
            Self::Decode(_) => "The server sent an unexpected response.".to_string(),
        }
    }
}

impl From<TransportError> for CodehubError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status: 401, message } => CodehubError::Auth(message),
            TransportError::Status { status: 403, message } => {
                CodehubError::PermissionDenied(message)
            }
            TransportError::Status { status: 404, message } => CodehubError::NotFound(message),
            TransportError::Status {
                status: 400 | 422,
                message,
            } => CodehubError::Validation(message),
            other => CodehubError::Transport(other.to_string()),
        }
    }
}

/// Issues CAPTCHA challenges
pub trait ChallengeService: Send + Sync {
    fn issue_challenge(&self) -> impl Future<Output = Result<Challenge, TransportError>> + Send;
}

/// Consumes a verified CAPTCHA pair together with credentials
pub trait AuthService: Send + Sync {
    fn verify_login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<Session, TransportError>> + Send;
}

/// Task persistence owned by the server
pub trait TaskService: Send + Sync {
    fn list_tasks(
        &self,
        project: ProjectId,
    ) -> impl Future<Output = Result<Vec<Task>, TransportError>> + Send;

    fn create_task(
        &self,
        project: ProjectId,
        fields: &NewTask,
    ) -> impl Future<Output = Result<Task, TransportError>> + Send;

    fn update_task(
        &self,
        id: TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<Task, TransportError>> + Send;

    fn update_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
    ) -> impl Future<Output = Result<Task, TransportError>> + Send;

    fn delete_task(&self, id: TaskId) -> impl Future<Output = Result<(), TransportError>> + Send;
}
