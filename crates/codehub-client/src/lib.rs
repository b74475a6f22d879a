//! # CodeHub Client
//!
//! Interaction core for the CodeHub frontend.
//!
//! ## Architecture
//! ```text
//! CaptchaWidget ──► ChallengeService ┐
//! submit_login  ──► AuthService      ├─► ApiClient (reqwest) ──► REST API
//! TaskBoard     ──► TaskService      ┘                          (or stub::create_router)
//! ```
//!
//! The widget and the board own their state behind async mutexes and talk to
//! the outside world only through the service traits in [`api`].

pub mod api;
pub mod board;
pub mod captcha;
pub mod config;
pub mod notice;
pub mod stub;

pub use api::{ApiClient, AuthService, ChallengeService, TaskService, TransportError};
pub use board::{BoardError, TaskBoard};
pub use captcha::{CaptchaWidget, WidgetState};
pub use config::ClientConfig;
pub use notice::{Notice, NoticeLevel};
