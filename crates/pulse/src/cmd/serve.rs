//! Serve command - Run the Pulse ingestion server

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use pulse_config::{Config, LogStoreConfig, LogStoreKind};
use pulse_pipeline::{Pipeline, PipelineMetrics};
use pulse_sources::{HttpSource, HttpSourceMetrics};
use pulse_store::{AppendLog, FileLog, MemoryAggregateStore, MemoryCategoryStore, MemoryLog};
use pulse_tap::TapPoint;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Serve command arguments
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file (defaults to configs/pulse.toml or pulse.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config_path = args
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(default)".to_string());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path,
        "Pulse starting"
    );

    let config = load_config(args.config)?;

    if let Err(e) = run_server(config).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("Pulse shutdown complete");
    Ok(())
}

/// Load the explicit config file, else the first default path found, else defaults
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    if let Some(path) = path {
        // User explicitly provided config path - must exist
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return Config::from_file(&path).context("failed to load configuration");
    }

    let default_paths = [PathBuf::from("configs/pulse.toml"), PathBuf::from("pulse.toml")];
    for path in &default_paths {
        if path.exists() {
            info!(config = %path.display(), "using config file");
            return Config::from_file(path).context("failed to load configuration");
        }
    }

    info!("no config file found, using defaults");
    Ok(Config::default())
}

/// Main server run loop
async fn run_server(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();

    let log = open_log(&config.log_store).await?;
    let last_position = log
        .last_position()
        .await
        .context("failed to read log position")?;

    let tap = Arc::new(TapPoint::new(&config.tap));
    let tap_maintenance = tap.spawn_maintenance(cancel.clone());

    let pipeline = Arc::new(Pipeline::new(
        Arc::new(MemoryCategoryStore::new()),
        Arc::new(MemoryAggregateStore::new()),
        &config.pipeline,
    ));

    let source = HttpSource::new(
        config.server.clone(),
        log,
        Arc::clone(&tap),
        Arc::clone(&pipeline),
    );
    let source_metrics = source.metrics();

    let source_cancel = cancel.clone();
    let source_task = tokio::spawn(async move { source.run(source_cancel).await });

    let metrics_task = if config.metrics.enabled {
        Some(spawn_metrics_reporter(
            config.metrics.interval,
            source_metrics,
            Arc::clone(pipeline.metrics()),
            Arc::clone(&tap),
            cancel.clone(),
        ))
    } else {
        info!("metrics reporting disabled");
        None
    };

    info!(
        address = %config.server.bind_address(),
        log_store = ?config.log_store.kind,
        last_position,
        anomaly_detection = pipeline.anomaly_detection(),
        "Pulse server running"
    );

    // Stop on a shutdown signal, or earlier if the server fails
    tokio::pin!(source_task);
    let early = tokio::select! {
        _ = wait_for_shutdown() => {
            info!("shutdown signal received, stopping server...");
            None
        }
        result = &mut source_task => Some(result),
    };

    cancel.cancel();

    let result = match early {
        Some(result) => result,
        None => source_task.await,
    };

    tap_maintenance.abort();
    if let Some(task) = metrics_task {
        task.abort();
    }

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e).context("HTTP source failed"),
        Err(e) => Err(anyhow::anyhow!("HTTP source task panicked: {e}")),
    }
}

/// Open the configured append log backend
async fn open_log(config: &LogStoreConfig) -> Result<Arc<dyn AppendLog>> {
    match config.kind {
        LogStoreKind::Memory => {
            warn!("using in-memory log; events are lost on restart");
            Ok(Arc::new(MemoryLog::new()))
        }
        LogStoreKind::File => {
            let path = config
                .path
                .as_ref()
                .context("log_store.path is required for the file log")?;
            let log = FileLog::open(path, config.fsync)
                .await
                .with_context(|| format!("failed to open log at {}", path.display()))?;
            info!(path = %path.display(), fsync = config.fsync, "file log opened");
            Ok(Arc::new(log))
        }
    }
}

/// Log ingestion, pipeline and fan-out counters every `interval`
fn spawn_metrics_reporter(
    interval: std::time::Duration,
    source: Arc<HttpSourceMetrics>,
    pipeline: Arc<PipelineMetrics>,
    tap: Arc<TapPoint>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        let mut previous = pipeline.snapshot();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let http = source.snapshot();
                    let current = pipeline.snapshot();
                    let delta = current.diff(&previous);
                    let tap = tap.stats();

                    info!(
                        requests = http.requests_total,
                        events_accepted = http.events_accepted,
                        events_rejected = http.events_rejected,
                        pipeline_errors = http.pipeline_errors,
                        processed_interval = delta.events_processed,
                        anomalies_interval = delta.anomalies_detected,
                        subscribers = tap.subscriber_count,
                        frames_dropped = tap.dropped_count,
                        "metrics"
                    );
                    previous = current;
                }
            }
        }
    })
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
