//! End-to-end: the reqwest client against the stub API on an ephemeral port.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use codehub_client::api::ApiClient;
use codehub_client::board::{BoardError, DragTuning, Point, TaskBoard};
use codehub_client::captcha::{CaptchaWidget, LoginError, WidgetState, submit_login};
use codehub_client::config::{ApiConfig, StubConfig};
use codehub_client::stub::{DEMO_EMAIL, DEMO_PASSWORD, DEMO_PROJECT, StubState, create_router};
use codehub_common::{NewTask, TaskStatus};
use tokio_test::assert_ok;

async fn spawn_stub() -> ApiClient {
    let state = StubState::with_demo_data(&StubConfig::default()).await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    ApiClient::new(&ApiConfig {
        base_url: format!("http://{addr}/"),
        request_timeout_secs: 5,
    })
    .unwrap()
}

/// Answer a "What is a op b?" question
fn solve(question: &str) -> i64 {
    let expr = question.trim_start_matches("What is ").trim_end_matches('?');
    let parts: Vec<&str> = expr.split(' ').collect();
    let a: i64 = parts[0].parse().unwrap();
    let b: i64 = parts[2].parse().unwrap();
    match parts[1] {
        "+" => a + b,
        "-" => a - b,
        _ => a * b,
    }
}

#[tokio::test]
async fn test_captcha_then_login() {
    let client = Arc::new(spawn_stub().await);
    let verified = Arc::new(AtomicUsize::new(0));
    let counter = verified.clone();
    let widget = CaptchaWidget::new(
        client.clone(),
        Box::new(move |_: &str, _: i64| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    assert_eq!(widget.click().await, WidgetState::Challenge);
    let snap = widget.snapshot().await;
    let answer = solve(&snap.question.unwrap());
    assert!(snap.seconds_left.unwrap() > 100);

    let pair = assert_ok!(widget.submit_answer(&format!(" {answer} ")).await);
    assert_eq!(pair.answer, answer);
    assert_eq!(verified.load(Ordering::SeqCst), 1);

    let session = assert_ok!(submit_login(client.as_ref(), &widget, DEMO_EMAIL, DEMO_PASSWORD).await);
    assert_eq!(session.user.username, "demo");
    assert!(client.is_authenticated().await);
    assert_eq!(widget.state().await, WidgetState::Idle);
}

#[tokio::test]
async fn test_wrong_answer_is_rejected_and_token_spent() {
    let client = Arc::new(spawn_stub().await);
    let widget = CaptchaWidget::new(client.clone(), Box::new(|_: &str, _: i64| {}));

    widget.click().await;
    let answer = solve(&widget.snapshot().await.question.unwrap());
    widget.submit_answer(&(answer + 1).to_string()).await.unwrap();

    let err = submit_login(client.as_ref(), &widget, DEMO_EMAIL, DEMO_PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::Rejected(ref m) if m == "Incorrect captcha answer"));
    assert_eq!(widget.state().await, WidgetState::Idle);
    assert!(!client.is_authenticated().await);

    // A fresh challenge is needed for the next attempt
    assert!(matches!(
        submit_login(client.as_ref(), &widget, DEMO_EMAIL, DEMO_PASSWORD).await,
        Err(LoginError::CaptchaRequired)
    ));
}

#[tokio::test]
async fn test_board_moves_and_rolls_back() {
    let client = Arc::new(spawn_stub().await);
    let board = TaskBoard::new(DEMO_PROJECT, client, DragTuning::default());
    assert_eq!(board.load().await.unwrap(), 6);

    // Pointer drag: "Set up CI pipeline" from To Do to Done
    board.pointer_down(1, Point::new(10.0, 10.0)).await.unwrap();
    let drop = board.pointer_drop(TaskStatus::Done).await.unwrap().unwrap();
    assert_eq!(drop.from, TaskStatus::Todo);

    board.reload().await.unwrap();
    assert_eq!(board.task(1).await.unwrap().status, TaskStatus::Done);

    // The locked task is refused by the server; the board restores it
    let locked = board
        .tasks()
        .await
        .into_iter()
        .find(|t| !t.can_drag)
        .unwrap();
    let err = board
        .update_task_status(locked.id, TaskStatus::Done)
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::Transport(_)));
    assert_eq!(board.task(locked.id).await.unwrap().status, locked.status);

    let notices = board.drain_notices().await;
    assert_eq!(notices.len(), 1);
    assert!(notices[0].message.contains("permission"));
}

#[tokio::test]
async fn test_board_create_and_delete() {
    let client = Arc::new(spawn_stub().await);
    let board = TaskBoard::new(DEMO_PROJECT, client, DragTuning::default());
    board.load().await.unwrap();

    let created = board
        .create_task(NewTask {
            title: "Integration task".to_string(),
            status: TaskStatus::Review,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(board.lanes().await[2].len(), 3);

    board.delete_task(created.id).await.unwrap();
    board.reload().await.unwrap();
    assert!(board.task(created.id).await.is_none());
}
