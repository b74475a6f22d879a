//! CAPTCHA widget: challenge fetch, answer collection, and timed expiry.
//!
//! The widget is a collector, not a validator. It hands `(token, answer)` to
//! its caller, and the login endpoint decides whether the answer is right.

mod login;
mod timer;
mod widget;

pub use login::{LoginError, submit_login};
pub use timer::ExpiryTimer;
pub use widget::{
    CaptchaWidget, ExpiredCallback, Verification, VerifiedCallback, WidgetSnapshot, WidgetState,
    parse_answer,
};

use thiserror::Error;

/// Local CAPTCHA errors; none of these reach the server
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptchaError {
    /// Input is not a base-10 integer
    #[error("Please enter a whole number")]
    InvalidAnswer(String),

    /// No challenge is currently displayed
    #[error("No active challenge; request a new one")]
    NoActiveChallenge,
}
