//! Common error types for CodeHub components.

use thiserror::Error;

/// Common errors across CodeHub components
#[derive(Debug, Error)]
pub enum CodehubError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed local input (never leaves the client)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network or HTTP-level failure talking to the API
    #[error("Transport error: {0}")]
    Transport(String),

    /// A challenge or session ran past its expiry
    #[error("Expired: {0}")]
    Expired(String),

    /// Authentication failed
    #[error("Auth error: {0}")]
    Auth(String),

    /// The caller lacks the permission flag for this action
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Referenced entity is unknown
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CodehubError {
    /// Returns the HTTP status code this error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Validation(_) => 400,
            Self::Transport(_) => 502,
            Self::Expired(_) => 410,
            Self::Auth(_) => 401,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
        }
    }

    /// Message without the category prefix, for response bodies
    pub fn detail(&self) -> &str {
        match self {
            Self::Config(m)
            | Self::Validation(m)
            | Self::Transport(m)
            | Self::Expired(m)
            | Self::Auth(m)
            | Self::PermissionDenied(m)
            | Self::NotFound(m)
            | Self::Internal(m) => m,
        }
    }

    /// Returns true if the user may sensibly retry the same action
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Expired(_))
    }
}
