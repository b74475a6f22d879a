//! # CodeHub Common
//!
//! Shared types, errors, and constants used across the CodeHub client components.
//!
//! ## Modules
//! - `types` - Core data structures (Challenge, Task, TaskStatus, etc.)
//! - `error` - Common error types
//! - `constants` - Shared timing and layout constants

pub mod constants;
pub mod error;
pub mod types;

pub use error::CodehubError;
pub use types::*;
