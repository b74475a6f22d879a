//! Shared constants for CodeHub client components.

/// Default CodeHub REST API base URL
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default listen address for the local stub API server
pub const DEFAULT_STUB_LISTEN_ADDR: &str = "127.0.0.1:8000";

/// Default HTTP request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Challenge validity issued by the stub server (2 minutes)
pub const DEFAULT_CHALLENGE_TTL_SECS: u64 = 120;

/// Touch hold required before a drag arms
pub const LONG_PRESS_MS: u64 = 300;

/// Finger movement (px) that cancels a pending long-press
pub const LONG_PRESS_MOVE_TOLERANCE_PX: f64 = 10.0;

/// Distance from a viewport edge (px) where auto-scroll starts
pub const AUTO_SCROLL_EDGE_PX: f64 = 80.0;

/// Slowest auto-scroll step (px per frame)
pub const AUTO_SCROLL_MIN_SPEED: f64 = 5.0;

/// Fastest auto-scroll step (px per frame)
pub const AUTO_SCROLL_MAX_SPEED: f64 = 15.0;

/// Haptic pulse requested when a touch drag arms
pub const HAPTIC_PULSE_MS: u64 = 50;

/// REST API paths
pub mod api_paths {
    /// Issue a CAPTCHA challenge
    pub const CAPTCHA: &str = "/api/captcha";

    /// Log in with credentials plus a CAPTCHA pair
    pub const LOGIN: &str = "/api/auth/login";

    /// Project tasks: /api/projects/{project_id}/tasks
    pub const PROJECTS_PREFIX: &str = "/api/projects/";

    /// Single task: /api/tasks/{task_id}
    pub const TASKS_PREFIX: &str = "/api/tasks/";
}
