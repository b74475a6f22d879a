//! CAPTCHA issue and login endpoints.

use axum::{Json, extract::State};
use codehub_common::{Challenge, LoginRequest, Session};

use super::ApiError;
use super::state::StubState;

/// Issue a new challenge
pub async fn get_challenge(State(state): State<StubState>) -> Json<Challenge> {
    Json(state.issue_challenge().await)
}

/// Verify credentials plus the CAPTCHA pair.
///
/// The challenge is consumed before credentials are checked, so every attempt
/// needs a fresh one.
pub async fn login(
    State(state): State<StubState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Session>, ApiError> {
    state
        .redeem_challenge(&payload.captcha_token, payload.captcha_answer)
        .await
        .inspect_err(|e| tracing::debug!(error = %e, "CAPTCHA rejected"))?;

    let session = state.login(&payload.email, &payload.password)?;
    tracing::info!(user = %session.user.username, "Login succeeded");
    Ok(Json(session))
}
