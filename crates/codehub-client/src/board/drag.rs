//! Drag-to-reorder engine.
//!
//! Pointer and touch input feed one `DragSession`. Both modalities go through
//! `start_drag` / `resolve_drop` / `cancel_drag`, so permission gating and the
//! lane-transition rule live in exactly one place. Time is passed in by the
//! caller; the engine never reads a clock or spawns anything.

use std::time::{Duration, Instant};

use codehub_common::{Task, TaskId, TaskStatus};
use thiserror::Error;

use crate::config::BoardConfig;

/// Screen coordinate in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

/// Where each lane sits on screen, for hit-testing touch points
#[derive(Debug, Clone, Default)]
pub struct LaneLayout {
    lanes: Vec<(TaskStatus, Rect)>,
}

impl LaneLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lane(mut self, status: TaskStatus, rect: Rect) -> Self {
        self.lanes.push((status, rect));
        self
    }

    /// Four equal side-by-side columns spanning `width` x `height`
    pub fn columns(width: f64, height: f64) -> Self {
        let col = width / TaskStatus::ALL.len() as f64;
        TaskStatus::ALL
            .iter()
            .enumerate()
            .fold(Self::new(), |layout, (i, status)| {
                layout.with_lane(*status, Rect::new(col * i as f64, 0.0, col, height))
            })
    }

    /// Lane under `point`, if any
    pub fn hit_test(&self, point: Point) -> Option<TaskStatus> {
        self.lanes
            .iter()
            .find(|(_, rect)| rect.contains(point))
            .map(|(status, _)| *status)
    }
}

/// How the current drag was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    Pointer,
    TouchLongPress,
}

/// The in-progress drag; at most one exists
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub task: Task,
    pub origin: Point,
    pub mode: ActivationMode,
    /// Last known pointer/finger position
    pub position: Point,
    /// Lane currently highlighted as drop target
    pub hovered_lane: Option<TaskStatus>,
}

/// Visual stand-in following the finger during a touch drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragProxy {
    pub task_id: TaskId,
    pub position: Point,
}

/// Returned when a long-press arms a touch drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Armed {
    pub task_id: TaskId,
    /// Vibration to request where the device supports it
    pub haptic: Duration,
    pub proxy: DragProxy,
}

/// Result of a touch move
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchMove {
    /// No touch interaction in progress
    Ignored,
    /// Still waiting for the long-press threshold
    Pending,
    /// Finger moved too far before the threshold; the gesture is a scroll
    ArmingCancelled,
    /// Drag in progress
    Dragging {
        proxy: DragProxy,
        hovered_lane: Option<TaskStatus>,
        /// Viewport scroll step for this frame (negative scrolls up)
        scroll: Option<f64>,
    },
}

/// A drop that changes lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropResolution {
    pub task_id: TaskId,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DragRefused {
    #[error("task {0} cannot be moved")]
    NotDraggable(TaskId),

    #[error("another drag is already in progress")]
    AlreadyDragging,
}

/// Thresholds for long-press arming and auto-scroll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragTuning {
    pub long_press: Duration,
    pub move_tolerance_px: f64,
    pub edge_threshold_px: f64,
    pub min_scroll_speed: f64,
    pub max_scroll_speed: f64,
    pub haptic: Duration,
}

impl Default for DragTuning {
    fn default() -> Self {
        Self::from(&BoardConfig::default())
    }
}

impl From<&BoardConfig> for DragTuning {
    fn from(config: &BoardConfig) -> Self {
        Self {
            long_press: Duration::from_millis(config.long_press_ms),
            move_tolerance_px: config.move_tolerance_px,
            edge_threshold_px: config.edge_threshold_px,
            min_scroll_speed: config.min_scroll_speed,
            max_scroll_speed: config.max_scroll_speed,
            haptic: Duration::from_millis(config.haptic_ms),
        }
    }
}

impl DragTuning {
    /// Auto-scroll step for a touch at `y` in a viewport `viewport_height` tall.
    ///
    /// Speed grows linearly from the floor at the band's inner edge to the
    /// ceiling at the viewport edge.
    pub fn auto_scroll(&self, y: f64, viewport_height: f64) -> Option<f64> {
        let band = self.edge_threshold_px;
        if y < band {
            Some(-self.scroll_speed(y.max(0.0)))
        } else if y > viewport_height - band {
            Some(self.scroll_speed((viewport_height - y).max(0.0)))
        } else {
            None
        }
    }

    fn scroll_speed(&self, distance: f64) -> f64 {
        let closeness = 1.0 - (distance / self.edge_threshold_px);
        let speed = self.min_scroll_speed + (self.max_scroll_speed - self.min_scroll_speed) * closeness;
        speed.clamp(self.min_scroll_speed, self.max_scroll_speed)
    }
}

#[derive(Debug, Clone)]
struct PendingPress {
    task: Task,
    origin: Point,
    started_at: Instant,
}

/// Drag state machine for one board
#[derive(Debug, Default)]
pub struct DragController {
    tuning: DragTuning,
    session: Option<DragSession>,
    pending: Option<PendingPress>,
}

impl DragController {
    pub fn new(tuning: DragTuning) -> Self {
        Self {
            tuning,
            session: None,
            pending: None,
        }
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn has_pending_press(&self) -> bool {
        self.pending.is_some()
    }

    /// Lane to highlight, if a drag is hovering one
    pub fn highlighted_lane(&self) -> Option<TaskStatus> {
        self.session.as_ref().and_then(|s| s.hovered_lane)
    }

    /// Finger-tracking proxy; only touch drags have one
    pub fn proxy(&self) -> Option<DragProxy> {
        self.session
            .as_ref()
            .filter(|s| s.mode == ActivationMode::TouchLongPress)
            .map(|s| DragProxy {
                task_id: s.task.id,
                position: s.position,
            })
    }

    /// Single entry point for beginning a drag
    pub fn start_drag(
        &mut self,
        task: &Task,
        origin: Point,
        mode: ActivationMode,
    ) -> Result<&DragSession, DragRefused> {
        if !task.can_drag {
            return Err(DragRefused::NotDraggable(task.id));
        }
        if self.session.is_some() {
            return Err(DragRefused::AlreadyDragging);
        }

        tracing::debug!(task_id = task.id, mode = ?mode, "Drag started");
        Ok(&*self.session.insert(DragSession {
            task: task.clone(),
            origin,
            mode,
            position: origin,
            hovered_lane: None,
        }))
    }

    /// Single exit point for a drop; clears every piece of transient state.
    ///
    /// Returns a resolution only when `target` differs from the task's lane.
    pub fn resolve_drop(&mut self, target: Option<TaskStatus>) -> Option<DropResolution> {
        self.pending = None;
        let session = self.session.take()?;

        match target {
            Some(to) if to != session.task.status => {
                tracing::debug!(task_id = session.task.id, from = %session.task.status, to = %to, "Drop resolved");
                Some(DropResolution {
                    task_id: session.task.id,
                    from: session.task.status,
                    to,
                })
            }
            _ => {
                tracing::debug!(task_id = session.task.id, "Drop without lane change");
                None
            }
        }
    }

    /// Abandon any drag or pending press
    pub fn cancel_drag(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::debug!(task_id = session.task.id, "Drag cancelled");
        }
        self.pending = None;
    }

    // === Pointer ===

    pub fn pointer_down(&mut self, task: &Task, at: Point) -> Result<&DragSession, DragRefused> {
        self.start_drag(task, at, ActivationMode::Pointer)
    }

    /// Track the lane under the pointer
    pub fn pointer_over(&mut self, lane: Option<TaskStatus>, at: Point) {
        if let Some(session) = self.session.as_mut() {
            session.position = at;
            session.hovered_lane = lane;
        }
    }

    pub fn pointer_drop(&mut self, lane: TaskStatus) -> Option<DropResolution> {
        self.resolve_drop(Some(lane))
    }

    // === Touch ===

    /// Begin waiting for a long-press; returns false when the press can never arm
    pub fn touch_start(&mut self, task: &Task, at: Point, now: Instant) -> bool {
        if !task.can_drag || self.session.is_some() {
            self.pending = None;
            return false;
        }
        self.pending = Some(PendingPress {
            task: task.clone(),
            origin: at,
            started_at: now,
        });
        true
    }

    /// Called when the long-press timer fires; arms the drag if the press held still
    pub fn long_press_due(&mut self, now: Instant) -> Option<Armed> {
        let pending = self.pending.as_ref()?;
        if now.duration_since(pending.started_at) < self.tuning.long_press {
            return None;
        }

        let pending = self.pending.take()?;
        let haptic = self.tuning.haptic;
        let session = self
            .start_drag(&pending.task, pending.origin, ActivationMode::TouchLongPress)
            .ok()?;

        Some(Armed {
            task_id: session.task.id,
            haptic,
            proxy: DragProxy {
                task_id: session.task.id,
                position: session.origin,
            },
        })
    }

    pub fn touch_move(
        &mut self,
        at: Point,
        layout: &LaneLayout,
        viewport_height: f64,
    ) -> TouchMove {
        if let Some(pending) = &self.pending {
            if pending.origin.distance(at) >= self.tuning.move_tolerance_px {
                tracing::trace!(task_id = pending.task.id, "Long-press cancelled by movement");
                self.pending = None;
                return TouchMove::ArmingCancelled;
            }
            return TouchMove::Pending;
        }

        let scroll = self.tuning.auto_scroll(at.y, viewport_height);
        match self.session.as_mut() {
            Some(session) if session.mode == ActivationMode::TouchLongPress => {
                session.position = at;
                session.hovered_lane = layout.hit_test(at);
                TouchMove::Dragging {
                    proxy: DragProxy {
                        task_id: session.task.id,
                        position: at,
                    },
                    hovered_lane: session.hovered_lane,
                    scroll,
                }
            }
            _ => TouchMove::Ignored,
        }
    }

    /// Resolve against the lane under the final touch point
    pub fn touch_end(&mut self, at: Point, layout: &LaneLayout) -> Option<DropResolution> {
        let touch_drag = self
            .session
            .as_ref()
            .is_some_and(|s| s.mode == ActivationMode::TouchLongPress);
        if !touch_drag {
            // A tap or an unarmed press: nothing to drop
            self.pending = None;
            return None;
        }
        self.resolve_drop(layout.hit_test(at))
    }

    pub fn touch_cancel(&mut self) {
        self.cancel_drag();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::test_support::task;

    fn layout() -> LaneLayout {
        LaneLayout::columns(800.0, 600.0)
    }

    fn locked(id: u64) -> Task {
        let mut t = task(id, "locked", TaskStatus::Todo);
        t.can_drag = false;
        t
    }

    #[test]
    fn test_layout_hit_test() {
        let layout = layout();
        assert_eq!(layout.hit_test(Point::new(10.0, 10.0)), Some(TaskStatus::Todo));
        assert_eq!(layout.hit_test(Point::new(250.0, 300.0)), Some(TaskStatus::InProgress));
        assert_eq!(layout.hit_test(Point::new(799.0, 599.0)), Some(TaskStatus::Done));
        assert_eq!(layout.hit_test(Point::new(850.0, 10.0)), None);
    }

    #[test]
    fn test_pointer_drag_to_other_lane() {
        let mut drag = DragController::default();
        let t = task(1, "a", TaskStatus::Todo);

        drag.pointer_down(&t, Point::new(10.0, 10.0)).unwrap();
        drag.pointer_over(Some(TaskStatus::Review), Point::new(500.0, 10.0));
        assert_eq!(drag.highlighted_lane(), Some(TaskStatus::Review));
        assert_eq!(drag.proxy(), None);

        let resolution = drag.pointer_drop(TaskStatus::Review).unwrap();
        assert_eq!(
            resolution,
            DropResolution {
                task_id: 1,
                from: TaskStatus::Todo,
                to: TaskStatus::Review
            }
        );
        assert!(!drag.is_dragging());
        assert_eq!(drag.highlighted_lane(), None);
    }

    #[test]
    fn test_drop_on_same_lane_is_noop() {
        let mut drag = DragController::default();
        let t = task(1, "a", TaskStatus::Todo);
        drag.pointer_down(&t, Point::default()).unwrap();
        assert_eq!(drag.pointer_drop(TaskStatus::Todo), None);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_single_session() {
        let mut drag = DragController::default();
        drag.pointer_down(&task(1, "a", TaskStatus::Todo), Point::default()).unwrap();
        assert_eq!(
            drag.pointer_down(&task(2, "b", TaskStatus::Todo), Point::default()).unwrap_err(),
            DragRefused::AlreadyDragging
        );
        drag.cancel_drag();
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_not_draggable_never_starts() {
        let mut drag = DragController::default();
        let t = locked(9);
        let t0 = Instant::now();

        assert_eq!(
            drag.pointer_down(&t, Point::default()).unwrap_err(),
            DragRefused::NotDraggable(9)
        );
        assert!(!drag.touch_start(&t, Point::new(5.0, 5.0), t0));
        for ms in [300, 1_000, 60_000] {
            assert_eq!(drag.long_press_due(t0 + Duration::from_millis(ms)), None);
        }
        assert!(!drag.is_dragging());
        assert_eq!(drag.touch_end(Point::new(500.0, 5.0), &layout()), None);
    }

    #[test]
    fn test_long_press_arms_after_threshold() {
        let mut drag = DragController::default();
        let t = task(3, "c", TaskStatus::Todo);
        let t0 = Instant::now();

        assert!(drag.touch_start(&t, Point::new(50.0, 300.0), t0));
        assert_eq!(drag.long_press_due(t0 + Duration::from_millis(299)), None);

        // Small jitter under the tolerance keeps the press alive
        assert_eq!(
            drag.touch_move(Point::new(53.0, 304.0), &layout(), 600.0),
            TouchMove::Pending
        );

        let armed = drag.long_press_due(t0 + Duration::from_millis(300)).unwrap();
        assert_eq!(armed.task_id, 3);
        assert_eq!(armed.haptic, Duration::from_millis(50));
        assert_eq!(armed.proxy.position, Point::new(50.0, 300.0));
        assert_eq!(drag.session().unwrap().mode, ActivationMode::TouchLongPress);
    }

    #[test]
    fn test_early_movement_cancels_arming() {
        let mut drag = DragController::default();
        let t = task(3, "c", TaskStatus::Todo);
        let t0 = Instant::now();

        drag.touch_start(&t, Point::new(50.0, 300.0), t0);
        assert_eq!(
            drag.touch_move(Point::new(50.0, 312.0), &layout(), 600.0),
            TouchMove::ArmingCancelled
        );
        assert_eq!(drag.long_press_due(t0 + Duration::from_millis(400)), None);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_touch_drag_resolves_lane_under_final_point() {
        let mut drag = DragController::default();
        let t = task(4, "d", TaskStatus::Todo);
        let t0 = Instant::now();
        let layout = layout();

        drag.touch_start(&t, Point::new(50.0, 300.0), t0);
        drag.long_press_due(t0 + Duration::from_millis(350)).unwrap();

        match drag.touch_move(Point::new(450.0, 300.0), &layout, 600.0) {
            TouchMove::Dragging {
                proxy,
                hovered_lane,
                scroll,
            } => {
                assert_eq!(proxy.position, Point::new(450.0, 300.0));
                assert_eq!(hovered_lane, Some(TaskStatus::Review));
                assert_eq!(scroll, None);
            }
            other => panic!("expected dragging, got {other:?}"),
        }
        assert_eq!(drag.highlighted_lane(), Some(TaskStatus::Review));
        assert!(drag.proxy().is_some());

        let resolution = drag.touch_end(Point::new(700.0, 300.0), &layout).unwrap();
        assert_eq!(resolution.to, TaskStatus::Done);
        assert!(!drag.is_dragging());
        assert_eq!(drag.proxy(), None);
        assert_eq!(drag.highlighted_lane(), None);
    }

    #[test]
    fn test_touch_end_outside_lanes_clears_state() {
        let mut drag = DragController::default();
        let t = task(4, "d", TaskStatus::Todo);
        let t0 = Instant::now();

        drag.touch_start(&t, Point::new(50.0, 300.0), t0);
        drag.long_press_due(t0 + Duration::from_millis(300)).unwrap();
        drag.touch_move(Point::new(250.0, 300.0), &layout(), 600.0);

        assert_eq!(drag.touch_end(Point::new(900.0, 300.0), &layout()), None);
        assert!(!drag.is_dragging());
        assert_eq!(drag.proxy(), None);
    }

    #[test]
    fn test_touch_cancel_clears_everything() {
        let mut drag = DragController::default();
        let t = task(4, "d", TaskStatus::Todo);
        let t0 = Instant::now();

        drag.touch_start(&t, Point::new(50.0, 300.0), t0);
        drag.long_press_due(t0 + Duration::from_millis(300)).unwrap();
        drag.touch_move(Point::new(250.0, 300.0), &layout(), 600.0);
        drag.touch_cancel();

        assert!(!drag.is_dragging());
        assert!(!drag.has_pending_press());
        assert_eq!(drag.highlighted_lane(), None);
        assert_eq!(drag.proxy(), None);
    }

    #[test]
    fn test_tap_without_hold_drops_nothing() {
        let mut drag = DragController::default();
        let t = task(4, "d", TaskStatus::Todo);
        drag.touch_start(&t, Point::new(50.0, 300.0), Instant::now());
        assert_eq!(drag.touch_end(Point::new(50.0, 300.0), &layout()), None);
        assert!(!drag.has_pending_press());
    }

    #[test]
    fn test_auto_scroll_speed() {
        let tuning = DragTuning::default();

        assert_eq!(tuning.auto_scroll(300.0, 600.0), None);
        assert_eq!(tuning.auto_scroll(80.0, 600.0), None);
        assert_eq!(tuning.auto_scroll(0.0, 600.0), Some(-15.0));
        assert_eq!(tuning.auto_scroll(600.0, 600.0), Some(15.0));
        assert_eq!(tuning.auto_scroll(40.0, 600.0), Some(-10.0));

        // Closer to the edge is faster, never outside [5, 15]
        let near = tuning.auto_scroll(590.0, 600.0).unwrap();
        let far = tuning.auto_scroll(530.0, 600.0).unwrap();
        assert!(near > far);
        assert!(far >= 5.0 && near <= 15.0);
        assert_eq!(tuning.auto_scroll(-20.0, 600.0), Some(-15.0));
    }
}
