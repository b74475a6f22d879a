//! Core types shared across CodeHub components.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Task identifier as issued by the Task Service
pub type TaskId = u64;

/// Project identifier as issued by the Task Service
pub type ProjectId = u64;

/// Server-issued math challenge.
///
/// The token is opaque; only the server knows the expected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Human-readable question, e.g. "7 + 5 = ?"
    pub question: String,

    /// Opaque token identifying this challenge server-side
    pub token: String,

    /// Expiry timestamp (Unix epoch seconds)
    pub expires_at: i64,
}

impl Challenge {
    /// Seconds remaining until expiry, saturating at zero
    pub fn seconds_left(&self, now: i64) -> u64 {
        u64::try_from(self.expires_at - now).unwrap_or(0)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Kanban status of a task.
///
/// Declaration order is the canonical lane order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    /// All statuses in canonical lane order
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Done => "done",
        }
    }

    /// Lane heading shown to users
    pub fn label(&self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Review => "Review",
            Self::Done => "Done",
        }
    }

    /// Position in the canonical lane order
    pub fn lane_index(&self) -> usize {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::Review => 2,
            Self::Done => 3,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(Self::Todo),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Sort rank: high sorts first, low last
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Reference to a platform user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: u64,
    pub username: String,
}

/// A task as cached by the board.
///
/// Owned by the Task Service; the client holds a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,

    /// Server grants edit/delete rights
    #[serde(default)]
    pub can_edit: bool,

    /// Server grants drag (status change) rights
    #[serde(default)]
    pub can_drag: bool,
}

impl Task {
    /// True if the due date lies strictly before `today` and the task is not done
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Done && self.due_date.is_some_and(|due| due < today)
    }

    /// Case-insensitive substring match against title and description
    pub fn matches_text(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let needle = needle.to_lowercase();
        let haystack = format!("{} {}", self.title, self.description).to_lowercase();
        haystack.contains(&needle)
    }
}

/// Fields accepted when creating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// Partial update for a full task edit; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl TaskPatch {
    /// Apply this patch onto a local task copy.
    ///
    /// `assignee_id` is not applied: resolving it to a `UserRef` is the server's job.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due) = self.due_date {
            task.due_date = Some(due);
        }
    }
}

/// Body of a status-only update
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: TaskStatus,
}

/// Login request carrying the CAPTCHA pair collected by the widget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub captcha_token: String,
    pub captcha_answer: i64,
}

/// Authenticated session returned by the login endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user: UserRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, description: &str) -> Task {
        Task {
            id: 1,
            title: title.to_string(),
            description: description.to_string(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            assignee: None,
            due_date: None,
            created_at: Utc::now(),
            can_edit: true,
            can_drag: true,
        }
    }

    #[test]
    fn test_status_order_is_canonical() {
        let mut shuffled = vec![TaskStatus::Done, TaskStatus::Todo, TaskStatus::Review, TaskStatus::InProgress];
        shuffled.sort();
        assert_eq!(shuffled, TaskStatus::ALL.to_vec());
        for (i, status) in TaskStatus::ALL.iter().enumerate() {
            assert_eq!(status.lane_index(), i);
        }
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!("blocked".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_priority_rank() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn test_text_match_is_case_insensitive() {
        let t = task("Write Parser", "handles UTF-8 input");
        assert!(t.matches_text("parser"));
        assert!(t.matches_text("utf-8"));
        assert!(t.matches_text(""));
        assert!(!t.matches_text("lexer"));
    }

    #[test]
    fn test_overdue() {
        let mut t = task("Report", "");
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert!(!t.is_overdue(today));

        t.due_date = NaiveDate::from_ymd_opt(2024, 5, 9);
        assert!(t.is_overdue(today));

        t.status = TaskStatus::Done;
        assert!(!t.is_overdue(today));
    }

    #[test]
    fn test_challenge_seconds_left() {
        let c = Challenge {
            question: "2 + 2 = ?".to_string(),
            token: "tok".to_string(),
            expires_at: 1_000,
        };
        assert_eq!(c.seconds_left(880), 120);
        assert_eq!(c.seconds_left(1_005), 0);
        assert!(c.is_expired(1_000));
        assert!(!c.is_expired(999));
    }

    #[test]
    fn test_task_defaults_on_sparse_payload() {
        let json = r#"{"id":7,"title":"Sparse","created_at":"2024-01-01T00:00:00Z"}"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert_eq!(t.status, TaskStatus::Todo);
        assert_eq!(t.priority, Priority::Medium);
        assert!(!t.can_drag);
        assert!(!t.can_edit);
    }
}
