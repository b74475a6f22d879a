//! Kanban task board: lanes, list filtering, drag input, optimistic moves.

mod drag;
mod lanes;
mod query;
mod task_board;

pub use drag::{
    ActivationMode, Armed, DragController, DragProxy, DragRefused, DragSession, DragTuning,
    DropResolution, LaneLayout, Point, Rect, TouchMove,
};
pub use lanes::{Lane, group_by_status};
pub use query::{SortOrder, TaskQuery};
pub use task_board::{BoardError, LaneView, TaskBoard, TaskCard};
