//! Filter and sort pipeline for the flat task list view.

use std::cmp::Reverse;
use std::str::FromStr;

use codehub_common::{Task, TaskStatus};
use serde::{Deserialize, Serialize};

/// Sort key for the task list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// created_at descending
    #[default]
    Newest,
    /// created_at ascending
    Oldest,
    /// high, medium, low
    Priority,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "priority" => Ok(Self::Priority),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Search text, optional status filter, and sort order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub search: String,
    pub status: Option<TaskStatus>,
    pub sort: SortOrder,
}

impl TaskQuery {
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Filter by text, then status, then stable-sort
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        let needle = self.search.trim();
        let mut out: Vec<Task> = tasks
            .iter()
            .filter(|t| t.matches_text(needle))
            .filter(|t| self.status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();

        // sort_by_key is stable: ties keep their input order
        match self.sort {
            SortOrder::Newest => out.sort_by_key(|t| Reverse(t.created_at)),
            SortOrder::Oldest => out.sort_by_key(|t| t.created_at),
            SortOrder::Priority => out.sort_by_key(|t| t.priority.rank()),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::test_support::task;
    use chrono::{Duration, TimeZone, Utc};
    use codehub_common::Priority;

    fn ids(tasks: &[Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id).collect()
    }

    fn dated(id: u64, title: &str, minutes: i64) -> Task {
        let mut t = task(id, title, TaskStatus::Todo);
        t.created_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes);
        t
    }

    #[test]
    fn test_search_matches_title_and_description() {
        let mut a = task(1, "Fix login page", TaskStatus::Todo);
        a.description = "captcha overflow".to_string();
        let b = task(2, "Write docs", TaskStatus::Todo);
        let tasks = vec![a, b];

        assert_eq!(ids(&TaskQuery::default().search("LOGIN").apply(&tasks)), vec![1]);
        assert_eq!(ids(&TaskQuery::default().search("Captcha").apply(&tasks)), vec![1]);
        assert_eq!(ids(&TaskQuery::default().search("  ").apply(&tasks)).len(), 2);
        assert!(TaskQuery::default().search("deploy").apply(&tasks).is_empty());
    }

    #[test]
    fn test_status_filter_after_search() {
        let tasks = vec![
            task(1, "api tests", TaskStatus::Todo),
            task(2, "api docs", TaskStatus::Done),
            task(3, "ui", TaskStatus::Done),
        ];
        let q = TaskQuery::default().search("api").status(TaskStatus::Done);
        assert_eq!(ids(&q.apply(&tasks)), vec![2]);
    }

    #[test]
    fn test_date_sorts() {
        let tasks = vec![dated(1, "a", 10), dated(2, "b", 30), dated(3, "c", 20)];
        assert_eq!(ids(&TaskQuery::default().apply(&tasks)), vec![2, 3, 1]);
        assert_eq!(
            ids(&TaskQuery::default().sort(SortOrder::Oldest).apply(&tasks)),
            vec![1, 3, 2]
        );
    }

    #[test]
    fn test_priority_sort_is_stable() {
        let mut tasks = Vec::new();
        for (id, priority) in [
            (1, Priority::Low),
            (2, Priority::High),
            (3, Priority::Medium),
            (4, Priority::High),
            (5, Priority::Low),
            (6, Priority::Medium),
        ] {
            let mut t = task(id, "t", TaskStatus::Todo);
            t.priority = priority;
            tasks.push(t);
        }
        let sorted = TaskQuery::default().sort(SortOrder::Priority).apply(&tasks);
        assert_eq!(ids(&sorted), vec![2, 4, 3, 6, 1, 5]);
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("Priority".parse::<SortOrder>().unwrap(), SortOrder::Priority);
        assert!("random".parse::<SortOrder>().is_err());
    }
}
