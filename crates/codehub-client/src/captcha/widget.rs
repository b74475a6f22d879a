//! CAPTCHA checkbox state machine.
//!
//! ```text
//!            click                 ok
//!   Idle ─────────────▶ Loading ─────────▶ Challenge ──submit──▶ Verified
//!    ▲  ▲                 │  ▲               │   │                   │
//!    │  │           fail  ▼  │ retry         │   │ new question      │
//!    │  │                Error               │   └──▶ Loading        │
//!    │  └──────── expiry / invalidate ───────┘                       │
//!    └─────────────────── expiry / invalidate ───────────────────────┘
//! ```
//!
//! The widget collects an answer, it does not judge it: correctness is decided
//! by the server when the `(token, answer)` pair is submitted with a login.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use codehub_common::Challenge;
use tokio::sync::Mutex;

use super::timer::ExpiryTimer;
use super::CaptchaError;
use crate::api::ChallengeService;

/// Called once per successful submission with `(token, answer)`
pub type VerifiedCallback = Box<dyn Fn(&str, i64) + Send + Sync>;

/// Called when a displayed or verified challenge lapses back to idle
pub type ExpiredCallback = Box<dyn Fn() + Send + Sync>;

/// Widget lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Idle,
    Loading,
    Challenge,
    Verified,
    Error,
}

/// The pair handed to the caller on verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub token: String,
    pub answer: i64,
}

/// Read-only view of the widget for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSnapshot {
    pub state: WidgetState,
    pub question: Option<String>,
    /// Error text in `Error`, inline validation text in `Challenge`
    pub message: Option<String>,
    pub seconds_left: Option<u64>,
    pub verification: Option<Verification>,
}

struct Callbacks {
    on_verified: VerifiedCallback,
    on_expired: Option<ExpiredCallback>,
    /// Set when the widget is dropped; a timer already past its lock must not call out
    unmounted: AtomicBool,
}

struct Inner {
    state: WidgetState,
    challenge: Option<Challenge>,
    verification: Option<Verification>,
    message: Option<String>,
    timer: Option<ExpiryTimer>,
    /// Bumped on every transition; fences stale timers and responses
    generation: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: WidgetState::Idle,
            challenge: None,
            verification: None,
            message: None,
            timer: None,
            generation: 0,
        }
    }

    /// Move to `next`, releasing whatever timer the previous state held
    fn transition(&mut self, next: WidgetState) -> u64 {
        tracing::debug!(from = ?self.state, to = ?next, "Captcha state transition");
        self.timer = None;
        self.state = next;
        self.generation += 1;
        self.generation
    }

    /// Reset to idle; returns true when leaving a live challenge or verification
    fn reset(&mut self) -> bool {
        let was_live = matches!(self.state, WidgetState::Challenge | WidgetState::Verified);
        self.transition(WidgetState::Idle);
        self.challenge = None;
        self.verification = None;
        self.message = None;
        was_live
    }
}

/// Checkbox-style CAPTCHA widget
pub struct CaptchaWidget<S> {
    service: Arc<S>,
    inner: Arc<Mutex<Inner>>,
    callbacks: Arc<Callbacks>,
}

impl<S: ChallengeService> CaptchaWidget<S> {
    pub fn new(service: Arc<S>, on_verified: VerifiedCallback) -> Self {
        Self::build(service, on_verified, None)
    }

    /// Widget that also reports when a challenge or verification lapses
    pub fn with_expiry_callback(
        service: Arc<S>,
        on_verified: VerifiedCallback,
        on_expired: ExpiredCallback,
    ) -> Self {
        Self::build(service, on_verified, Some(on_expired))
    }

    fn build(service: Arc<S>, on_verified: VerifiedCallback, on_expired: Option<ExpiredCallback>) -> Self {
        Self {
            service,
            inner: Arc::new(Mutex::new(Inner::new())),
            callbacks: Arc::new(Callbacks {
                on_verified,
                on_expired,
                unmounted: AtomicBool::new(false),
            }),
        }
    }

    pub async fn state(&self) -> WidgetState {
        self.inner.lock().await.state
    }

    pub async fn snapshot(&self) -> WidgetSnapshot {
        let inner = self.inner.lock().await;
        let now = chrono::Utc::now().timestamp();
        let live = matches!(inner.state, WidgetState::Challenge | WidgetState::Verified);
        WidgetSnapshot {
            state: inner.state,
            question: inner
                .challenge
                .as_ref()
                .filter(|_| live)
                .map(|c| c.question.clone()),
            message: inner.message.clone(),
            seconds_left: inner
                .challenge
                .as_ref()
                .filter(|_| live)
                .map(|c| c.seconds_left(now)),
            verification: inner.verification.clone(),
        }
    }

    /// The checkbox click: starts loading from `Idle`, retries from `Error`
    pub async fn click(&self) -> WidgetState {
        self.load(|state| matches!(state, WidgetState::Idle | WidgetState::Error))
            .await
    }

    /// Swap the displayed question for a fresh one
    pub async fn new_question(&self) -> WidgetState {
        self.load(|state| state == WidgetState::Challenge).await
    }

    /// Fetch a challenge from any state that allows it.
    ///
    /// A call while already `Loading` returns immediately without a second request.
    pub async fn request_challenge(&self) -> WidgetState {
        self.load(|state| {
            matches!(
                state,
                WidgetState::Idle | WidgetState::Error | WidgetState::Challenge
            )
        })
        .await
    }

    async fn load(&self, allowed: impl Fn(WidgetState) -> bool) -> WidgetState {
        let generation = {
            let mut inner = self.inner.lock().await;
            if !allowed(inner.state) {
                tracing::debug!(state = ?inner.state, "Challenge request ignored");
                return inner.state;
            }
            inner.challenge = None;
            inner.verification = None;
            inner.message = None;
            inner.transition(WidgetState::Loading)
        };

        let result = self.service.issue_challenge().await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            tracing::debug!("Discarding challenge response for superseded request");
            return inner.state;
        }

        match result {
            Ok(challenge) => {
                tracing::debug!(expires_at = challenge.expires_at, "Challenge issued");
                let expires_at = challenge.expires_at;
                inner.challenge = Some(challenge);
                let generation = inner.transition(WidgetState::Challenge);
                inner.timer = Some(self.arm_expiry(generation, expires_at));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch challenge");
                inner.transition(WidgetState::Error);
                inner.message = Some(e.user_message());
            }
        }
        inner.state
    }

    /// Submit the user's answer for the current challenge.
    ///
    /// Only the integer syntax is checked here.
    pub async fn submit_answer(&self, raw: &str) -> Result<Verification, CaptchaError> {
        let verification = {
            let mut inner = self.inner.lock().await;
            if inner.state != WidgetState::Challenge {
                return Err(CaptchaError::NoActiveChallenge);
            }
            let Some(challenge) = inner.challenge.clone() else {
                return Err(CaptchaError::NoActiveChallenge);
            };
            // The expiry task may not have run yet
            if challenge.is_expired(chrono::Utc::now().timestamp()) {
                return Err(CaptchaError::NoActiveChallenge);
            }

            let answer = match parse_answer(raw) {
                Ok(answer) => answer,
                Err(e) => {
                    inner.message = Some(e.to_string());
                    return Err(e);
                }
            };

            let verification = Verification {
                token: challenge.token,
                answer,
            };
            inner.message = None;
            inner.verification = Some(verification.clone());
            let generation = inner.transition(WidgetState::Verified);
            inner.timer = Some(self.arm_expiry(generation, challenge.expires_at));
            verification
        };

        tracing::info!("Captcha answer collected");
        (self.callbacks.on_verified)(&verification.token, verification.answer);
        Ok(verification)
    }

    /// Caller-driven reset (e.g. after the pair was consumed by a login attempt)
    pub async fn invalidate(&self) {
        let was_live = self.inner.lock().await.reset();
        if was_live {
            tracing::debug!("Captcha invalidated by caller");
            if let Some(on_expired) = &self.callbacks.on_expired {
                on_expired();
            }
        }
    }

    fn arm_expiry(&self, generation: u64, expires_at: i64) -> ExpiryTimer {
        let weak = Arc::downgrade(&self.inner);
        let callbacks = Arc::clone(&self.callbacks);

        ExpiryTimer::arm(delay_until(expires_at), async move {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let was_live = {
                let mut inner = shared.lock().await;
                if inner.generation != generation {
                    return;
                }
                if let Some(timer) = inner.timer.take() {
                    timer.fired();
                }
                inner.reset()
            };
            if was_live && !callbacks.unmounted.load(Ordering::SeqCst) {
                tracing::info!("Captcha challenge expired");
                if let Some(on_expired) = &callbacks.on_expired {
                    on_expired();
                }
            }
        })
    }
}

impl<S> Drop for CaptchaWidget<S> {
    fn drop(&mut self) {
        self.callbacks.unmounted.store(true, Ordering::SeqCst);
        // A firing task may hold the lock; the flag above silences it
        if let Ok(mut inner) = self.inner.try_lock() {
            inner.timer = None;
            inner.generation += 1;
        }
    }
}

/// Parse a base-10 integer answer, tolerating surrounding whitespace
pub fn parse_answer(raw: &str) -> Result<i64, CaptchaError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| CaptchaError::InvalidAnswer(raw.to_string()))
}

fn delay_until(expires_at: i64) -> Duration {
    let now_ms = chrono::Utc::now().timestamp_millis();
    let left_ms = expires_at.saturating_mul(1000).saturating_sub(now_ms);
    Duration::from_millis(u64::try_from(left_ms).unwrap_or(0))
}
