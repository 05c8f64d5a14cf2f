//! Pulse - Telemetry ingestion server
//!
//! # Usage
//!
//! ```bash
//! # Run the server (default)
//! pulse
//! pulse serve --config configs/pulse.toml
//!
//! # Send sample events through the batching transport
//! pulse test --endpoint http://localhost:3001/v1/collect --count 25
//!
//! # Print a day's aggregates from a running server
//! pulse snapshot --date 2024-03-01
//! ```

mod cmd;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use pulse_config::{Config, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Pulse - Telemetry ingestion server
#[derive(Parser, Debug)]
#[command(name = "pulse")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the ingestion server
    Serve(cmd::serve::ServeArgs),

    /// Send sample events to verify a running server
    Test(cmd::test::TestArgs),

    /// Print the aggregate snapshot for one day
    Snapshot(cmd::snapshot::SnapshotArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve(mut args)) => {
            // Global --config applies when the subcommand did not set one
            if args.config.is_none() && cli.config.is_some() {
                args.config = cli.config;
            }
            init_logging(cli.log_level.as_deref(), args.config.as_deref())?;
            cmd::serve::run(args).await
        }
        Some(Command::Test(mut args)) => {
            if args.config.is_none() && cli.config.is_some() {
                args.config = cli.config;
            }
            // Transport warnings are useful while testing; default to warn
            init_logging(
                Some(cli.log_level.as_deref().unwrap_or("warn")),
                args.config.as_deref(),
            )?;
            cmd::test::run(args).await
        }
        Some(Command::Snapshot(args)) => {
            // Snapshot doesn't need logging - just outputs to stdout
            cmd::snapshot::run(args).await
        }
        // No subcommand = run server
        None => {
            init_logging(cli.log_level.as_deref(), cli.config.as_deref())?;
            let args = cmd::serve::ServeArgs { config: cli.config };
            cmd::serve::run(args).await
        }
    }
}

/// Resolve log level and format: CLI flag > config file > defaults
fn resolve_logging(cli_level: Option<&str>, config_path: Option<&Path>) -> (String, LogFormat) {
    let config = config_path
        .filter(|path| path.exists())
        .and_then(|path| Config::from_file(path).ok());

    let format = config.as_ref().map(|c| c.log.format).unwrap_or_default();

    if let Some(level) = cli_level {
        return (level.to_string(), format);
    }

    let level = config
        .map(|c| c.log.level.as_str())
        .unwrap_or("info")
        .to_string();
    (level, format)
}

/// Initialize the tracing subscriber for logging
fn init_logging(cli_level: Option<&str>, config_path: Option<&Path>) -> Result<()> {
    let (level, format) = resolve_logging(cli_level, config_path);

    let filter = EnvFilter::try_new(&level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init(),
    }

    Ok(())
}
