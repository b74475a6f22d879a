//! Lane derivation.
//!
//! Lanes are never stored: they are rebuilt from the full task collection on
//! every read so they cannot drift from it.

use codehub_common::{Task, TaskStatus};

/// One kanban column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

impl Lane {
    pub fn title(&self) -> &'static str {
        self.status.label()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Partition `tasks` into the four lanes in canonical order.
///
/// Input order is preserved inside each lane.
pub fn group_by_status(tasks: &[Task]) -> [Lane; 4] {
    let mut lanes = TaskStatus::ALL.map(|status| Lane {
        status,
        tasks: Vec::new(),
    });
    for task in tasks {
        lanes[task.status.lane_index()].tasks.push(task.clone());
    }
    lanes
}
