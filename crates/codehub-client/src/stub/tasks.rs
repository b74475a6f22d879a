//! Task endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use codehub_common::{NewTask, ProjectId, StatusUpdate, Task, TaskId, TaskPatch};

use super::ApiError;
use super::state::StubState;

pub async fn list_tasks(
    State(state): State<StubState>,
    Path(project): Path<ProjectId>,
) -> Json<Vec<Task>> {
    Json(state.list_tasks(project).await)
}

pub async fn create_task(
    State(state): State<StubState>,
    Path(project): Path<ProjectId>,
    Json(fields): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.create_task(project, &fields).await?;
    tracing::debug!(task_id = task.id, project, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(state): State<StubState>,
    Path(id): Path<TaskId>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.update_task(id, &patch).await?))
}

pub async fn update_status(
    State(state): State<StubState>,
    Path(id): Path<TaskId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Task>, ApiError> {
    let task = state.update_status(id, body.status).await?;
    tracing::debug!(task_id = id, status = %body.status, "Task status changed");
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<StubState>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, ApiError> {
    state.delete_task(id).await?;
    tracing::debug!(task_id = id, "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}
