//! In-memory stand-in for the CodeHub REST API.
//!
//! Serves the same endpoints the client talks to, backed by a process-local
//! store. Used by `codehub serve-stub` and the integration tests.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use codehub_common::CodehubError;
use serde_json::json;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

mod captcha;
mod generator;
mod health;
mod state;
mod tasks;

pub use generator::{MathChallenge, generate_token};
pub use state::{DEMO_EMAIL, DEMO_PASSWORD, DEMO_PROJECT, StubState};

use crate::config::StubConfig;

/// Handler error, rendered as `{"error": ".."}` with the matching status
#[derive(Debug)]
pub struct ApiError(CodehubError);

impl From<CodehubError> for ApiError {
    fn from(err: CodehubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.0.detail() }))).into_response()
    }
}

/// Create the stub API router
pub fn create_router(state: StubState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        // CAPTCHA + auth
        .route("/api/captcha", get(captcha::get_challenge))
        .route("/api/auth/login", post(captcha::login))
        // Tasks
        .route(
            "/api/projects/{project_id}/tasks",
            get(tasks::list_tasks).post(tasks::create_task),
        )
        .route(
            "/api/tasks/{id}",
            patch(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/api/tasks/{id}/status", patch(tasks::update_status))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves
pub async fn serve(
    config: &StubConfig,
    state: StubState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "Stub API listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    tracing::info!("Stub API shutdown complete");
    Ok(())
}
