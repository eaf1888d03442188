//! mediawatch - media folder monitor
//!
//! Watches media folders, batches changes per library and asks Emby to rescan
//! them on a fixed cycle, with Telegram notifications along the way.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mediawatch::{describe_config, load_config, InstanceLock};
use mediawatch_watcher::{MonitorService, ServiceOptions};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mediawatch")]
#[command(about = "Watch media folders and trigger Emby library rescans")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor until interrupted (default)
    Run,
    /// Load and validate the configuration, then print a summary
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(cli.config.as_deref()).await,
        Commands::CheckConfig => check_config(cli.config.as_deref()),
    };

    if let Err(e) = &result {
        error!("{e:#}");
    }
    result
}

/// Initialize logging system
///
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!(
            "{}={level},mediawatch_core={level},mediawatch_dispatch={level},mediawatch_watcher={level}",
            env!("CARGO_CRATE_NAME")
        ))
    })?;

    tracing_subscriber::fmt().with_env_filter(filter).init();

    Ok(())
}

fn check_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    print!("{}", describe_config(&config));
    println!("Configuration is valid");
    Ok(())
}

/// Run the monitor until Ctrl+C or SIGTERM
async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    let _lock = InstanceLock::acquire(&config.monitor.lock_file)?;

    let dispatcher = mediawatch_dispatch::create_scan_dispatcher(&config)
        .context("Failed to create Emby dispatcher")?;
    let notifier = mediawatch_dispatch::create_chat_notifier(&config.telegram)
        .context("Failed to create chat notifier")?;

    let service = MonitorService::start(
        &config,
        ServiceOptions::from_config(&config),
        dispatcher,
        notifier,
    )
    .await
    .context("Failed to start media monitor")?;

    wait_for_shutdown_signal().await;

    service
        .shutdown()
        .await
        .context("Media monitor did not shut down cleanly")?;
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => match result {
                        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
                        Err(e) => error!("Error waiting for Ctrl+C: {e}"),
                    },
                    _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
                }
                return;
            }
            Err(e) => error!("Error setting up SIGTERM handler: {e}"),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(e) => error!("Error setting up signal handler: {e}"),
    }
}
