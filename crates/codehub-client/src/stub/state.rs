//! In-memory store behind the stub API.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{Duration, Utc};
use codehub_common::{
    CodehubError, Challenge, NewTask, Priority, ProjectId, Session, Task, TaskId, TaskPatch,
    TaskStatus, UserRef,
};
use tokio::sync::RwLock;

use super::generator::{MathChallenge, generate_token};
use crate::config::StubConfig;

/// Demo account accepted by the login endpoint
pub const DEMO_EMAIL: &str = "demo@codehub.dev";
pub const DEMO_PASSWORD: &str = "codehub";

/// Project seeded with sample tasks
pub const DEMO_PROJECT: ProjectId = 1;

#[derive(Debug, Clone)]
struct StoredChallenge {
    answer: i64,
    expires_at: i64,
}

#[derive(Debug, Clone)]
struct StoredTask {
    project: ProjectId,
    task: Task,
}

#[derive(Debug, Default)]
struct Store {
    challenges: HashMap<String, StoredChallenge>,
    tasks: BTreeMap<TaskId, StoredTask>,
    next_task_id: TaskId,
}

/// Shared stub state
#[derive(Clone)]
pub struct StubState {
    /// How long an issued challenge stays answerable
    pub challenge_ttl_secs: u64,
    store: Arc<RwLock<Store>>,
}

impl StubState {
    pub fn new(config: &StubConfig) -> Self {
        Self {
            challenge_ttl_secs: config.challenge_ttl_secs,
            store: Arc::new(RwLock::new(Store {
                next_task_id: 1,
                ..Default::default()
            })),
        }
    }

    /// State pre-populated with the demo project's tasks
    pub async fn with_demo_data(config: &StubConfig) -> Self {
        let state = Self::new(config);
        let samples = [
            ("Set up CI pipeline", TaskStatus::Todo, Priority::High),
            ("Write API docs", TaskStatus::Todo, Priority::Low),
            ("Login page CAPTCHA", TaskStatus::InProgress, Priority::High),
            ("Review board drag code", TaskStatus::Review, Priority::Medium),
            ("Release 0.1", TaskStatus::Done, Priority::Medium),
        ];
        for (title, status, priority) in samples {
            state
                .insert_task(
                    DEMO_PROJECT,
                    &NewTask {
                        title: title.to_string(),
                        status,
                        priority,
                        ..Default::default()
                    },
                )
                .await;
        }

        // One task owned by someone else: visible, not editable or movable
        let locked = state
            .insert_task(
                DEMO_PROJECT,
                &NewTask {
                    title: "Quarterly budget".to_string(),
                    status: TaskStatus::Review,
                    ..Default::default()
                },
            )
            .await;
        state.set_permissions(locked.id, false, false).await;
        state
    }

    // === Challenges ===

    /// Issue a fresh challenge and remember its answer
    pub async fn issue_challenge(&self) -> Challenge {
        let math = MathChallenge::generate();
        let token = generate_token();
        let expires_at = Utc::now().timestamp() + self.challenge_ttl_secs as i64;

        let mut store = self.store.write().await;
        let now = Utc::now().timestamp();
        store.challenges.retain(|_, c| c.expires_at > now);
        store.challenges.insert(
            token.clone(),
            StoredChallenge {
                answer: math.answer,
                expires_at,
            },
        );

        tracing::debug!(token = %token, question = %math.question, "Issued challenge");
        Challenge {
            question: math.question,
            token,
            expires_at,
        }
    }

    /// Check and consume a challenge; a token is good for one attempt only
    pub async fn redeem_challenge(&self, token: &str, answer: i64) -> Result<(), CodehubError> {
        let stored = self
            .store
            .write()
            .await
            .challenges
            .remove(token)
            .ok_or_else(|| CodehubError::Validation("Invalid or expired captcha".to_string()))?;

        if Utc::now().timestamp() >= stored.expires_at {
            return Err(CodehubError::Validation("Invalid or expired captcha".to_string()));
        }
        if stored.answer != answer {
            return Err(CodehubError::Validation("Incorrect captcha answer".to_string()));
        }
        Ok(())
    }

    // === Sessions ===

    /// Demo login; tokens are not tracked, the stub accepts any bearer
    pub fn login(&self, email: &str, password: &str) -> Result<Session, CodehubError> {
        if !email.eq_ignore_ascii_case(DEMO_EMAIL) || password != DEMO_PASSWORD {
            return Err(CodehubError::Auth("Invalid email or password".to_string()));
        }
        let user = UserRef {
            id: 1,
            username: "demo".to_string(),
        };
        Ok(Session {
            access_token: generate_token(),
            user,
        })
    }

    // === Tasks ===

    pub async fn list_tasks(&self, project: ProjectId) -> Vec<Task> {
        self.store
            .read()
            .await
            .tasks
            .values()
            .filter(|s| s.project == project)
            .map(|s| s.task.clone())
            .collect()
    }

    pub async fn create_task(&self, project: ProjectId, fields: &NewTask) -> Result<Task, CodehubError> {
        if fields.title.trim().is_empty() {
            return Err(CodehubError::Validation("Title is required".to_string()));
        }
        Ok(self.insert_task(project, fields).await)
    }

    pub async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, CodehubError> {
        let mut store = self.store.write().await;
        let stored = editable(&mut store, id)?;
        patch.apply_to(&mut stored.task);
        Ok(stored.task.clone())
    }

    pub async fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<Task, CodehubError> {
        let mut store = self.store.write().await;
        let stored = store
            .tasks
            .get_mut(&id)
            .ok_or_else(|| CodehubError::NotFound(format!("Task {id} not found")))?;
        if !stored.task.can_drag {
            return Err(CodehubError::PermissionDenied(
                "You do not have permission to move this task".to_string(),
            ));
        }
        stored.task.status = status;
        Ok(stored.task.clone())
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<(), CodehubError> {
        let mut store = self.store.write().await;
        editable(&mut store, id)?;
        store.tasks.remove(&id);
        Ok(())
    }

    /// Change what the current user may do with a task
    pub async fn set_permissions(&self, id: TaskId, can_edit: bool, can_drag: bool) {
        if let Some(stored) = self.store.write().await.tasks.get_mut(&id) {
            stored.task.can_edit = can_edit;
            stored.task.can_drag = can_drag;
        }
    }

    async fn insert_task(&self, project: ProjectId, fields: &NewTask) -> Task {
        let mut store = self.store.write().await;
        let id = store.next_task_id;
        store.next_task_id += 1;

        let task = Task {
            id,
            title: fields.title.trim().to_string(),
            description: fields.description.clone(),
            status: fields.status,
            priority: fields.priority,
            assignee: None,
            due_date: fields.due_date,
            // Space creation times so date sorts are deterministic
            created_at: Utc::now() + Duration::milliseconds(id as i64),
            can_edit: true,
            can_drag: true,
        };
        store.tasks.insert(
            id,
            StoredTask {
                project,
                task: task.clone(),
            },
        );
        task
    }
}

fn editable(store: &mut Store, id: TaskId) -> Result<&mut StoredTask, CodehubError> {
    let stored = store
        .tasks
        .get_mut(&id)
        .ok_or_else(|| CodehubError::NotFound(format!("Task {id} not found")))?;
    if !stored.task.can_edit {
        return Err(CodehubError::PermissionDenied(
            "You do not have permission to edit this task".to_string(),
        ));
    }
    Ok(stored)
}
