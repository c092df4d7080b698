//! stackwatch - turns orchestration stack state into event streams

use anyhow::{Context, Result};
use clap::Parser;
use stackwatch_core::config::{resolve_config, ConfigOverrides};
use stackwatch_daemon::provider::ApiRegistry;
use stackwatch_daemon::sink::{JsonLinesSink, SinkRegistry};
use stackwatch_daemon::supervisor::SupervisorOptions;
use stackwatch_daemon::Supervisor;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Poll orchestration stacks and print new events as JSON lines
#[derive(Parser, Debug)]
#[command(name = "stackwatch")]
#[command(about = "Poll orchestration stacks and print new events as JSON lines")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory for seed files (overrides config)
    #[arg(long, value_name = "PATH")]
    cache_dir: Option<PathBuf>,

    /// Default poll interval in seconds (overrides config)
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        stackwatch_core::logging::init_with_level(tracing::Level::DEBUG);
    } else {
        stackwatch_core::logging::init();
    }

    info!("stackwatch starting...");

    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;

    let overrides = ConfigOverrides {
        config_path: args.config.clone(),
        cache_directory: args.cache_dir.clone(),
        interval_secs: args.interval,
    };
    let config = resolve_config(&overrides, &current_dir, &home_dir)
        .context("Failed to resolve configuration")?;

    if let Some(config_path) = &args.config {
        info!("Loaded config from: {}", config_path.display());
    } else {
        info!("Using resolved configuration");
    }

    let targets = config.targets_with_defaults();
    if targets.is_empty() {
        warn!("No [[targets]] configured; nothing to poll");
    }

    let apis = Arc::new(ApiRegistry::with_builtin());
    let sinks = Arc::new(SinkRegistry::new());
    let downstream = Arc::new(JsonLinesSink::stdout());

    let supervisor = Supervisor::build(
        &targets,
        apis,
        sinks.clone(),
        downstream,
        SupervisorOptions::from(&config.daemon),
    )
    .context("Failed to build pollers")?;
    sinks.register(config.daemon.name.clone(), supervisor.intake());
    info!(
        "Accepting events as '{}' for {} target(s)",
        config.daemon.name,
        supervisor.len()
    );

    let cancel_token = CancellationToken::new();

    // Set up signal handlers
    let cancel_for_signals = cancel_token.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        cancel_for_signals.cancel();
    });

    let summary = supervisor.run(cancel_token).await;
    if summary.timed_out > 0 {
        warn!("{} poller(s) did not stop in time", summary.timed_out);
    }

    info!("stackwatch shutdown complete");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {
                        info!("Received SIGINT (Ctrl+C)");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM");
                    }
                }
            }
            Err(e) => {
                error!("Failed to create SIGTERM handler: {}", e);
                if let Err(e) = ctrl_c.await {
                    error!("Failed to listen for Ctrl+C: {}", e);
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        match ctrl_c.await {
            Ok(()) => info!("Received Ctrl+C"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    }
}
