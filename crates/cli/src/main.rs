//! `gemggark` -- terminal host for the gem optimization client.
//!
//! Validates an input file, submits it to the optimization service, and
//! follows the task's progress stream until it completes or fails.
//!
//! # Environment variables
//!
//! | Variable                            | Default                 | Description                      |
//! |-------------------------------------|-------------------------|----------------------------------|
//! | `GEMGGARK_API_URL`                  | `http://localhost:8000` | HTTP base URL of the service     |
//! | `GEMGGARK_WS_URL`                   | `ws://localhost:8000`   | WebSocket base URL               |
//! | `GEMGGARK_REQUEST_TIMEOUT_SECS`     | `30`                    | Per-request HTTP timeout         |
//! | `GEMGGARK_STREAM_IDLE_TIMEOUT_SECS` | `120`                   | Stall watchdog, `0` disables it  |

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use gemggark_cli::render;
use gemggark_client::api::TaskApi;
use gemggark_client::client::ProgressStreamClient;
use gemggark_client::config::ClientConfig;
use gemggark_client::controller::{LivePageController, PageState, Transition};
use gemggark_core::input::{estimated_duration, OptimizeInput};
use gemggark_core::request::format_request;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "gemggark", about = "Submit gem optimization jobs and follow their progress")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit an optimization job and wait for its result.
    Optimize {
        /// JSON file with cores, held gems, crystal price and simulations.
        input: PathBuf,
    },
    /// Print current gem market prices.
    Prices,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemggark=info,gemggark_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env().context("Invalid configuration")?;
    tracing::info!(api_url = %config.api_url, ws_url = %config.ws_url, "Loaded client configuration");

    match cli.command {
        Command::Optimize { input } => optimize(&config, input).await,
        Command::Prices => prices(&config).await,
    }
}

async fn optimize(config: &ClientConfig, path: PathBuf) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let input = OptimizeInput::from_json(&text)?;
    input.validate()?;

    println!(
        "Running {} simulations per gem (estimated time: {})",
        input.simulations_per_gem,
        estimated_duration(input.simulations_per_gem)
    );

    let payload = format_request(&input);
    let mut controller = LivePageController::new(
        TaskApi::from_config(config)?,
        ProgressStreamClient::from_config(config),
    );

    let task_id = controller.submit(&payload).await?;
    println!("Submitted task {task_id}");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let transition = tokio::select! {
            _ = &mut ctrl_c => None,
            transition = controller.next_transition() => Some(transition),
        };

        match transition {
            None => {
                controller.cancel();
                bail!("Cancelled by user");
            }
            Some(None) => break,
            Some(Some(Transition::Connected)) => println!("Connected, waiting for task status..."),
            Some(Some(Transition::Progress(update))) => println!("{}", render::progress_line(&update)),
            Some(Some(Transition::Completed)) => break,
            Some(Some(Transition::Failed(err))) => bail!("Optimization failed: {}", err.display_message()),
            Some(Some(Transition::Discarded)) => {}
        }
    }

    match controller.state() {
        PageState::Result { payload } => {
            println!("{}", serde_json::to_string_pretty(payload)?);
            Ok(())
        }
        state => bail!("Task ended without a result (state: {state:?})"),
    }
}

async fn prices(config: &ClientConfig) -> anyhow::Result<()> {
    let api = TaskApi::from_config(config)?;
    let prices = api.fetch_market_prices().await?;

    for category in ["질서", "혼돈"] {
        println!("== {category} ==");
        println!("{}", render::price_table(&prices, category));
        println!();
    }
    Ok(())
}
