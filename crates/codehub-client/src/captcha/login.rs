//! Login submission consuming the widget's verified pair.

use codehub_common::{LoginRequest, Session};
use thiserror::Error;

use super::CaptchaWidget;
use crate::api::{AuthService, ChallengeService, TransportError};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("Complete the CAPTCHA first")]
    CaptchaRequired,

    /// Server refused the credentials or the CAPTCHA answer
    #[error("Login rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Send credentials plus the widget's verified pair to the auth service.
///
/// The challenge token is single-use server-side, so the widget is reset after
/// every attempt that reached the server, successful or not. A network failure
/// leaves the verified pair in place for another attempt.
pub async fn submit_login<A, S>(
    auth: &A,
    widget: &CaptchaWidget<S>,
    email: &str,
    password: &str,
) -> Result<Session, LoginError>
where
    A: AuthService,
    S: ChallengeService,
{
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(LoginError::MissingCredentials);
    }

    let Some(verification) = widget.snapshot().await.verification else {
        return Err(LoginError::CaptchaRequired);
    };

    let request = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
        captcha_token: verification.token,
        captcha_answer: verification.answer,
    };

    let result = auth.verify_login(&request).await;
    if !matches!(result, Err(TransportError::Network(_))) {
        widget.invalidate().await;
    }

    match result {
        Ok(session) => Ok(session),
        Err(TransportError::Status {
            status: 400 | 401 | 403,
            message,
        }) => {
            tracing::info!(email = %email, "Login rejected");
            Err(LoginError::Rejected(message))
        }
        Err(e) => Err(LoginError::Transport(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captcha::WidgetState;
    use codehub_common::{Challenge, UserRef};
    use std::sync::Arc;
    use std::sync::Mutex;

    struct OneChallenge;

    impl ChallengeService for OneChallenge {
        async fn issue_challenge(&self) -> Result<Challenge, TransportError> {
            Ok(Challenge {
                question: "6 + 1 = ?".to_string(),
                token: "tok-login".to_string(),
                expires_at: chrono::Utc::now().timestamp() + 120,
            })
        }
    }

    #[derive(Default)]
    struct FakeAuth {
        seen: Mutex<Vec<LoginRequest>>,
    }

    impl AuthService for FakeAuth {
        async fn verify_login(&self, request: &LoginRequest) -> Result<Session, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            if request.captcha_answer == 7 {
                Ok(Session {
                    access_token: "jwt".to_string(),
                    user: UserRef {
                        id: 1,
                        username: "ada".to_string(),
                    },
                })
            } else {
                Err(TransportError::Status {
                    status: 400,
                    message: "Invalid captcha".to_string(),
                })
            }
        }
    }

    /// Auth service behind a dead connection
    struct Unreachable;

    impl AuthService for Unreachable {
        async fn verify_login(&self, _request: &LoginRequest) -> Result<Session, TransportError> {
            Err(TransportError::Network("connection reset".to_string()))
        }
    }

    fn widget() -> CaptchaWidget<OneChallenge> {
        CaptchaWidget::new(Arc::new(OneChallenge), Box::new(|_: &str, _: i64| {}))
    }

    #[tokio::test]
    async fn test_login_requires_verified_captcha() {
        let auth = FakeAuth::default();
        let widget = widget();

        let err = submit_login(&auth, &widget, "ada@uni.edu", "pw").await.unwrap_err();
        assert!(matches!(err, LoginError::CaptchaRequired));

        let err = submit_login(&auth, &widget, " ", "pw").await.unwrap_err();
        assert!(matches!(err, LoginError::MissingCredentials));
        assert!(auth.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_forwards_pair_and_resets_widget() {
        let auth = FakeAuth::default();
        let widget = widget();
        widget.click().await;
        widget.submit_answer("7").await.unwrap();

        let session = submit_login(&auth, &widget, "ada@uni.edu", "pw").await.unwrap();
        assert_eq!(session.user.username, "ada");

        let seen = auth.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].captcha_token, "tok-login");
        assert_eq!(seen[0].captcha_answer, 7);
        assert_eq!(widget.state().await, WidgetState::Idle);
    }

    #[tokio::test]
    async fn test_wrong_answer_is_rejected_by_server() {
        let auth = FakeAuth::default();
        let widget = widget();
        widget.click().await;
        widget.submit_answer("8").await.unwrap();

        let err = submit_login(&auth, &widget, "ada@uni.edu", "pw").await.unwrap_err();
        assert!(matches!(err, LoginError::Rejected(ref m) if m == "Invalid captcha"));
        assert_eq!(widget.state().await, WidgetState::Idle);
    }

    #[tokio::test]
    async fn test_network_failure_keeps_pair_for_retry() {
        let widget = widget();
        widget.click().await;
        widget.submit_answer("7").await.unwrap();

        let err = submit_login(&Unreachable, &widget, "ada@uni.edu", "pw").await.unwrap_err();
        assert!(matches!(err, LoginError::Transport(TransportError::Network(_))));
        assert_eq!(widget.state().await, WidgetState::Verified);

        let auth = FakeAuth::default();
        let session = submit_login(&auth, &widget, "ada@uni.edu", "pw").await.unwrap();
        assert_eq!(session.user.username, "ada");
        assert_eq!(auth.seen.lock().unwrap()[0].captcha_token, "tok-login");
        assert_eq!(widget.state().await, WidgetState::Idle);
    }
}
