//! The `cubebot` binary.
//!
//! Reads interactions as JSON lines on stdin and writes gateway actions to
//! stdout. Logs go to stderr whenever stdout is taken by the gateway.
//!
//! ```bash
//! cubebot --config cubebot.toml --deploy
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cubebot_modules::FEATURES;
use cubebot_runtime::config::LogOutput;
use cubebot_runtime::{ConfigLoader, CubeRuntime, StartMode, StdioGateway, logging};
use tracing::info;

/// Cubebot -- interaction-driven community bot.
#[derive(Parser, Debug)]
#[command(name = "cubebot", version, about)]
struct Cli {
    /// Register commands with the platform before connecting
    #[arg(long)]
    deploy: bool,

    /// Configuration file (defaults to cubebot.toml in the working or config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }
    let mut config = loader.load().context("failed to load configuration")?;

    if config.logging.output == LogOutput::Stdout {
        config.logging.output = LogOutput::Stderr;
    }
    logging::init_from_config(&config.logging);

    let mode = if cli.deploy {
        StartMode::DeployThenConnect
    } else {
        StartMode::Connect
    };
    info!(?mode, "Starting cubebot");

    CubeRuntime::builder()
        .config(config)
        .module(&FEATURES)
        .gateway(StdioGateway::new())
        .build()?
        .run(mode)
        .await?;

    info!("Cubebot stopped");
    Ok(())
}
