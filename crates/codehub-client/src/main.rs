//! # codehub - CodeHub interaction core CLI
//!
//! Drives the CAPTCHA widget and the task board from a terminal, and can run
//! the in-memory stub API for local development.
//!
//! ## Usage
//! ```text
//! codehub serve-stub                     # API on 127.0.0.1:8000
//! codehub captcha --email demo@codehub.dev --password codehub
//! codehub board --project 1 --sort priority
//! codehub move --project 1 --task 3 --to done
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use codehub_client::api::ApiClient;
use codehub_client::board::{DragTuning, SortOrder, TaskBoard, TaskQuery};
use codehub_client::captcha::{CaptchaWidget, WidgetState, submit_login};
use codehub_client::config::{ClientConfig, ConfigOverrides};
use codehub_client::stub::{self, StubState};
use codehub_common::{ProjectId, TaskId, TaskStatus};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// CodeHub CLI - CAPTCHA widget and task board
#[derive(Parser, Debug)]
#[command(name = "codehub")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/codehub.toml")]
    config: String,

    /// API base URL (overrides config)
    #[arg(long, env = "CODEHUB_API_URL")]
    api_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve a CAPTCHA interactively, optionally logging in with it
    Captcha {
        #[arg(long)]
        email: Option<String>,

        #[arg(long, env = "CODEHUB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Print a project's board
    Board {
        #[arg(short, long)]
        project: ProjectId,

        /// Flat list filtered by title/description text
        #[arg(long)]
        search: Option<String>,

        /// Flat list limited to one status
        #[arg(long)]
        status: Option<TaskStatus>,

        /// Flat list order (newest, oldest, priority)
        #[arg(long)]
        sort: Option<SortOrder>,
    },

    /// Move one or more tasks to another lane
    Move {
        #[arg(short, long)]
        project: ProjectId,

        #[arg(short, long = "task", required = true)]
        tasks: Vec<TaskId>,

        #[arg(long)]
        to: TaskStatus,
    },

    /// Run the in-memory stub API
    ServeStub {
        /// Listen address (overrides config)
        #[arg(short, long, env = "LISTEN_ADDR")]
        listen: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs)?;

    let overrides = ConfigOverrides {
        api_url: args.api_url.clone(),
        listen_addr: match &args.command {
            Command::ServeStub { listen } => listen.clone(),
            _ => None,
        },
    };
    let config = ClientConfig::load(&args.config, &overrides)?;
    tracing::debug!(path = %args.config, api = %config.api.base_url, "Configuration loaded");

    match args.command {
        Command::Captcha { email, password } => run_captcha(&config, email, password).await,
        Command::Board {
            project,
            search,
            status,
            sort,
        } => run_board(&config, project, search, status, sort).await,
        Command::Move { project, tasks, to } => run_move(&config, project, tasks, to).await,
        Command::ServeStub { .. } => run_stub(&config).await,
    }
}

async fn run_captcha(config: &ClientConfig, email: Option<String>, password: Option<String>) -> Result<()> {
    let client = Arc::new(ApiClient::new(&config.api).context("Failed to create API client")?);
    let widget = CaptchaWidget::with_expiry_callback(
        client.clone(),
        Box::new(|token: &str, answer: i64| info!(token = %token, answer, "CAPTCHA verified")),
        Box::new(|| warn!("CAPTCHA expired; request a new one")),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    widget.click().await;

    let verification = loop {
        let snap = widget.snapshot().await;
        match snap.state {
            WidgetState::Verified => {
                if let Some(v) = snap.verification {
                    break v;
                }
            }
            WidgetState::Error => {
                println!("{}", snap.message.unwrap_or_default());
                println!("Press enter to retry.");
                if lines.next_line().await?.is_none() {
                    bail!("stdin closed");
                }
                widget.click().await;
            }
            WidgetState::Idle => {
                println!("Challenge expired, fetching another.");
                widget.click().await;
            }
            WidgetState::Loading => tokio::time::sleep(Duration::from_millis(50)).await,
            WidgetState::Challenge => {
                if let Some(msg) = &snap.message {
                    println!("{msg}");
                }
                println!(
                    "{} ({}s left, type 'new' for another question)",
                    snap.question.unwrap_or_default(),
                    snap.seconds_left.unwrap_or(0)
                );
                let Some(line) = lines.next_line().await? else {
                    bail!("stdin closed");
                };
                if line.trim().eq_ignore_ascii_case("new") {
                    widget.new_question().await;
                    continue;
                }
                // Rejections surface through the next snapshot's message or state
                if let Err(e) = widget.submit_answer(&line).await {
                    tracing::debug!(error = %e, "Answer not accepted");
                }
            }
        }
    };

    println!("token:  {}", verification.token);
    println!("answer: {}", verification.answer);

    if let (Some(email), Some(password)) = (email, password) {
        let session = submit_login(client.as_ref(), &widget, &email, &password).await?;
        println!("Logged in as {}", session.user.username);
    }
    Ok(())
}

async fn run_board(
    config: &ClientConfig,
    project: ProjectId,
    search: Option<String>,
    status: Option<TaskStatus>,
    sort: Option<SortOrder>,
) -> Result<()> {
    let board = open_board(config, project).await?;

    if search.is_none() && status.is_none() && sort.is_none() {
        let today = chrono::Local::now().date_naive();
        for lane in board.view(today).await {
            println!("== {} ({}) ==", lane.title, lane.cards.len());
            for card in lane.cards {
                let mut flags = Vec::new();
                if card.overdue {
                    flags.push("overdue");
                }
                if !card.show_edit {
                    flags.push("read-only");
                }
                if !card.draggable {
                    flags.push("locked");
                }
                println!(
                    "  #{:<4} [{}] {} {}",
                    card.task.id,
                    card.task.priority,
                    card.task.title,
                    flags.join(" ")
                );
            }
        }
        return Ok(());
    }

    let mut query = TaskQuery::default().search(search.unwrap_or_default());
    if let Some(status) = status {
        query = query.status(status);
    }
    if let Some(sort) = sort {
        query = query.sort(sort);
    }
    for task in board.filtered(&query).await {
        println!("#{:<4} {:<12} [{}] {}", task.id, task.status.label(), task.priority, task.title);
    }
    Ok(())
}

async fn run_move(config: &ClientConfig, project: ProjectId, tasks: Vec<TaskId>, to: TaskStatus) -> Result<()> {
    let board = open_board(config, project).await?;

    let moves = tasks.iter().map(|&id| board.update_task_status(id, to));
    let results = futures::future::join_all(moves).await;

    for notice in board.drain_notices().await {
        println!("{notice}");
    }

    let failed = results.iter().filter(|r| r.is_err()).count();
    for (id, result) in tasks.iter().zip(&results) {
        match result {
            Ok(()) => println!("#{id} -> {}", to.label()),
            Err(e) => println!("#{id} not moved: {e}"),
        }
    }
    if failed > 0 {
        bail!("{failed} of {} moves failed", tasks.len());
    }
    Ok(())
}

async fn run_stub(config: &ClientConfig) -> Result<()> {
    info!("Starting CodeHub stub API v{}", env!("CARGO_PKG_VERSION"));
    let state = StubState::with_demo_data(&config.stub).await;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    stub::serve(&config.stub, state, shutdown_signal).await
}

async fn open_board(config: &ClientConfig, project: ProjectId) -> Result<TaskBoard<ApiClient>> {
    let client = ApiClient::new(&config.api).context("Failed to create API client")?;
    let board = TaskBoard::new(project, Arc::new(client), DragTuning::from(&config.board));
    board
        .load()
        .await
        .with_context(|| format!("Failed to load project {project}"))?;
    Ok(board)
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
