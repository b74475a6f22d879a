//! Kanban board: cached task collection, drag input, and server reconciliation.
//!
//! Status changes from a drag are optimistic: the local copy moves first and is
//! rolled back if the server refuses. Create, full edit, and delete wait for
//! the server before touching the cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use codehub_common::{CodehubError, NewTask, ProjectId, Task, TaskId, TaskPatch, TaskStatus};
use thiserror::Error;
use tokio::sync::Mutex;

use super::drag::{
    Armed, DragController, DragRefused, DragSession, DragTuning, DropResolution, LaneLayout, Point,
    TouchMove,
};
use super::lanes::{Lane, group_by_status};
use super::query::TaskQuery;
use crate::api::{TaskService, TransportError};
use crate::notice::Notice;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("you cannot edit task {0}")]
    NotEditable(TaskId),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Drag(#[from] DragRefused),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("board is no longer mounted")]
    Unmounted,
}

/// A task as rendered on the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCard {
    pub task: Task,
    /// Render the edit button
    pub show_edit: bool,
    pub draggable: bool,
    pub overdue: bool,
    /// This card is the one being dragged
    pub dragging: bool,
}

/// A lane as rendered on the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneView {
    pub status: TaskStatus,
    pub title: &'static str,
    pub cards: Vec<TaskCard>,
    /// Drop target under the pointer/finger
    pub highlighted: bool,
}

struct BoardState {
    tasks: Vec<Task>,
    drag: DragController,
    notices: Vec<Notice>,
    /// Tasks with status changes awaiting the server
    in_flight: HashMap<TaskId, InFlight>,
    next_revision: u64,
    /// Bumped on every load; older in-flight answers no longer apply
    epoch: u64,
    mounted: bool,
}

/// Optimistic status changes of one task still awaiting the server
struct InFlight {
    /// Revision of the most recently issued change
    latest: u64,
    /// Last status the server accepted
    confirmed: TaskStatus,
    pending: usize,
    rolled_back: bool,
}

impl BoardState {
    fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn editable(&self, id: TaskId) -> Result<&Task, BoardError> {
        let task = self.task(id).ok_or(BoardError::NotFound(id))?;
        if !task.can_edit {
            return Err(BoardError::NotEditable(id));
        }
        Ok(task)
    }

    /// Record the server's answer to one status change. Returns the status the
    /// local copy must switch to, if any.
    fn settle_status(&mut self, id: TaskId, revision: u64, accepted: Option<TaskStatus>) -> Option<TaskStatus> {
        let entry = self.in_flight.get_mut(&id)?;
        let show = match accepted {
            Some(status) => {
                entry.confirmed = status;
                // A newer change failed and fell back to an older confirmation
                entry.rolled_back.then_some(status)
            }
            None if entry.latest == revision => {
                entry.rolled_back = true;
                Some(entry.confirmed)
            }
            None => None,
        };
        entry.pending -= 1;
        if entry.pending == 0 {
            self.in_flight.remove(&id);
        }
        show
    }
}

/// Task board for one project
pub struct TaskBoard<S> {
    project: ProjectId,
    service: Arc<S>,
    state: Mutex<BoardState>,
}

impl<S: TaskService> TaskBoard<S> {
    pub fn new(project: ProjectId, service: Arc<S>, tuning: DragTuning) -> Self {
        Self {
            project,
            service,
            state: Mutex::new(BoardState {
                tasks: Vec::new(),
                drag: DragController::new(tuning),
                notices: Vec::new(),
                in_flight: HashMap::new(),
                next_revision: 0,
                epoch: 0,
                mounted: true,
            }),
        }
    }

    pub fn project(&self) -> ProjectId {
        self.project
    }

    /// Fetch the project's tasks, replacing the local cache
    pub async fn load(&self) -> Result<usize, BoardError> {
        self.ensure_mounted().await?;

        match self.service.list_tasks(self.project).await {
            Ok(tasks) => {
                let mut state = self.state.lock().await;
                if !state.mounted {
                    return Ok(0);
                }
                let count = tasks.len();
                state.tasks = tasks;
                state.in_flight.clear();
                state.epoch += 1;
                tracing::debug!(project = self.project, count, "Tasks loaded");
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(project = self.project, error = %e, "Failed to load tasks");
                self.notify(failure_notice("Failed to load tasks", &e)).await;
                Err(e.into())
            }
        }
    }

    /// Re-fetch to reconcile the cache with the server
    pub async fn reload(&self) -> Result<usize, BoardError> {
        self.load().await
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.lock().await.tasks.clone()
    }

    pub async fn task(&self, id: TaskId) -> Option<Task> {
        self.state.lock().await.task(id).cloned()
    }

    /// Current lanes, recomputed from the whole collection
    pub async fn lanes(&self) -> [Lane; 4] {
        group_by_status(&self.state.lock().await.tasks)
    }

    /// Flat list view through the filter/sort pipeline
    pub async fn filtered(&self, query: &TaskQuery) -> Vec<Task> {
        query.apply(&self.state.lock().await.tasks)
    }

    /// Render model: lanes with per-card affordances
    pub async fn view(&self, today: NaiveDate) -> Vec<LaneView> {
        let state = self.state.lock().await;
        let highlighted = state.drag.highlighted_lane();
        let dragged = state.drag.session().map(|s| s.task.id);

        group_by_status(&state.tasks)
            .into_iter()
            .map(|lane| LaneView {
                status: lane.status,
                title: lane.title(),
                highlighted: highlighted == Some(lane.status),
                cards: lane
                    .tasks
                    .into_iter()
                    .map(|task| TaskCard {
                        show_edit: task.can_edit,
                        draggable: task.can_drag,
                        overdue: task.is_overdue(today),
                        dragging: dragged == Some(task.id),
                        task,
                    })
                    .collect(),
            })
            .collect()
    }

    /// Take all pending notices
    pub async fn drain_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.state.lock().await.notices)
    }

    /// Stop accepting input; in-flight calls finish without touching state
    pub async fn unmount(&self) {
        let mut state = self.state.lock().await;
        state.mounted = false;
        state.drag.cancel_drag();
        tracing::debug!(project = self.project, "Board unmounted");
    }

    // === Status changes ===

    /// Move a task to another lane, optimistically.
    ///
    /// The local copy changes immediately. If the server refuses the most
    /// recent move of a task, the task returns to the last status the server
    /// accepted for it. A refused move that was already superseded by a newer
    /// one leaves the local copy alone.
    pub async fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<(), BoardError> {
        let (revision, epoch, previous) = {
            let mut state = self.state.lock().await;
            if !state.mounted {
                return Err(BoardError::Unmounted);
            }
            let task = state.task_mut(id).ok_or(BoardError::NotFound(id))?;
            if task.status == status {
                return Ok(());
            }
            let previous = std::mem::replace(&mut task.status, status);
            state.next_revision += 1;
            let revision = state.next_revision;
            let entry = state.in_flight.entry(id).or_insert(InFlight {
                latest: revision,
                confirmed: previous,
                pending: 0,
                rolled_back: false,
            });
            entry.latest = revision;
            entry.pending += 1;
            entry.rolled_back = false;
            (revision, state.epoch, previous)
        };

        tracing::debug!(task_id = id, from = %previous, to = %status, "Optimistic status change");
        let result = self.service.update_task_status(id, status).await;

        let mut state = self.state.lock().await;
        if !state.mounted {
            tracing::debug!(task_id = id, "Board unmounted; dropping status response");
            return Ok(());
        }
        let show = if state.epoch == epoch {
            state.settle_status(id, revision, result.as_ref().ok().map(|_| status))
        } else {
            None
        };
        if let Some(shown) = show {
            if let Some(task) = state.task_mut(id) {
                task.status = shown;
            }
        }

        match result {
            Ok(_) => {
                tracing::info!(task_id = id, status = %status, "Task moved");
                Ok(())
            }
            Err(e) => {
                match show {
                    Some(restored) => {
                        tracing::warn!(task_id = id, error = %e, restored = %restored, "Status update failed; rolled back")
                    }
                    None => tracing::warn!(task_id = id, error = %e, "Superseded status update failed"),
                }
                state.notices.push(failure_notice("Could not move task", &e));
                Err(e.into())
            }
        }
    }

    // === CRUD ===

    pub async fn create_task(&self, fields: NewTask) -> Result<Task, BoardError> {
        self.ensure_mounted().await?;
        if fields.title.trim().is_empty() {
            let err = BoardError::Validation("Task title is required".to_string());
            self.notify(Notice::error(err.to_string())).await;
            return Err(err);
        }

        let result = self.service.create_task(self.project, &fields).await;

        let mut state = self.state.lock().await;
        if !state.mounted {
            return result.map_err(BoardError::from);
        }
        match result {
            Ok(task) => {
                tracing::info!(task_id = task.id, project = self.project, "Task created");
                state.tasks.push(task.clone());
                state.notices.push(Notice::success("Task created"));
                Ok(task)
            }
            Err(e) => {
                tracing::warn!(project = self.project, error = %e, "Failed to create task");
                state.notices.push(failure_notice("Could not create task", &e));
                Err(e.into())
            }
        }
    }

    /// Full edit; the cache takes the server's copy on success
    pub async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task, BoardError> {
        self.check_editable(id).await?;

        let result = self.service.update_task(id, &patch).await;

        let mut state = self.state.lock().await;
        if !state.mounted {
            return result.map_err(BoardError::from);
        }
        match result {
            Ok(updated) => {
                if let Some(task) = state.task_mut(id) {
                    *task = updated.clone();
                }
                tracing::info!(task_id = id, "Task updated");
                state.notices.push(Notice::success("Task updated"));
                Ok(updated)
            }
            Err(e) => {
                tracing::warn!(task_id = id, error = %e, "Failed to update task");
                state.notices.push(failure_notice("Could not update task", &e));
                Err(e.into())
            }
        }
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<(), BoardError> {
        self.check_editable(id).await?;

        let result = self.service.delete_task(id).await;

        let mut state = self.state.lock().await;
        if !state.mounted {
            return result.map_err(BoardError::from);
        }
        match result {
            Ok(()) => {
                state.tasks.retain(|t| t.id != id);
                state.in_flight.remove(&id);
                tracing::info!(task_id = id, "Task deleted");
                state.notices.push(Notice::success("Task deleted"));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(task_id = id, error = %e, "Failed to delete task");
                state.notices.push(failure_notice("Could not delete task", &e));
                Err(e.into())
            }
        }
    }

    // === Drag input ===

    pub async fn drag_session(&self) -> Option<DragSession> {
        self.state.lock().await.drag.session().cloned()
    }

    pub async fn pointer_down(&self, id: TaskId, at: Point) -> Result<(), BoardError> {
        let mut state = self.state.lock().await;
        if !state.mounted {
            return Err(BoardError::Unmounted);
        }
        let task = state.task(id).cloned().ok_or(BoardError::NotFound(id))?;
        state.drag.pointer_down(&task, at)?;
        Ok(())
    }

    pub async fn pointer_over(&self, lane: Option<TaskStatus>, at: Point) {
        self.state.lock().await.drag.pointer_over(lane, at);
    }

    /// Drop onto `lane`; moves the task when the lane differs
    pub async fn pointer_drop(&self, lane: TaskStatus) -> Result<Option<DropResolution>, BoardError> {
        let resolution = self.state.lock().await.drag.pointer_drop(lane);
        self.apply_drop(resolution).await
    }

    pub async fn cancel_drag(&self) {
        self.state.lock().await.drag.cancel_drag();
    }

    /// Start a long-press; false when the task cannot be dragged
    pub async fn touch_start(&self, id: TaskId, at: Point, now: Instant) -> bool {
        let mut state = self.state.lock().await;
        if !state.mounted {
            return false;
        }
        let Some(task) = state.task(id).cloned() else {
            return false;
        };
        state.drag.touch_start(&task, at, now)
    }

    pub async fn long_press_due(&self, now: Instant) -> Option<Armed> {
        self.state.lock().await.drag.long_press_due(now)
    }

    pub async fn touch_move(&self, at: Point, layout: &LaneLayout, viewport_height: f64) -> TouchMove {
        self.state
            .lock()
            .await
            .drag
            .touch_move(at, layout, viewport_height)
    }

    pub async fn touch_end(
        &self,
        at: Point,
        layout: &LaneLayout,
    ) -> Result<Option<DropResolution>, BoardError> {
        let resolution = self.state.lock().await.drag.touch_end(at, layout);
        self.apply_drop(resolution).await
    }

    pub async fn touch_cancel(&self) {
        self.state.lock().await.drag.touch_cancel();
    }

    async fn apply_drop(
        &self,
        resolution: Option<DropResolution>,
    ) -> Result<Option<DropResolution>, BoardError> {
        match resolution {
            Some(drop) => {
                self.update_task_status(drop.task_id, drop.to).await?;
                Ok(Some(drop))
            }
            None => Ok(None),
        }
    }

    // === helpers ===

    async fn ensure_mounted(&self) -> Result<(), BoardError> {
        if self.state.lock().await.mounted {
            Ok(())
        } else {
            Err(BoardError::Unmounted)
        }
    }

    async fn check_editable(&self, id: TaskId) -> Result<(), BoardError> {
        let mut state = self.state.lock().await;
        if !state.mounted {
            return Err(BoardError::Unmounted);
        }
        if let Err(e) = state.editable(id) {
            state.notices.push(Notice::error(e.to_string()));
            return Err(e);
        }
        Ok(())
    }

    async fn notify(&self, notice: Notice) {
        let mut state = self.state.lock().await;
        if state.mounted {
            state.notices.push(notice);
        }
    }
}

/// Error notice for a failed server call; transient failures invite a retry
fn failure_notice(action: &str, err: &TransportError) -> Notice {
    let mut message = format!("{action}: {}", err.user_message());
    if CodehubError::from(err.clone()).is_retryable() {
        message.push_str(" Please try again.");
    }
    Notice::error(message)
}
