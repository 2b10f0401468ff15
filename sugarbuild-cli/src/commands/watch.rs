//! Watch command handler

use anyhow::{Context, Result};
use colored::*;
use sugarbuild_core::domain::config::BuildConfig;
use sugarbuild_runner::SharedConfig;
use sugarbuild_runner::sync::start_watcher;

use super::serve::spawn_dashboard;

/// Mirrors source changes into the output tree until interrupted
pub async fn run_watch(config: BuildConfig) -> Result<()> {
    let _dashboard = spawn_dashboard(&config);
    let source = config.sugar_dir();

    start_watcher(SharedConfig::new(config))
        .await
        .with_context(|| format!("Failed to watch {}", source.display()))?;
    println!("{}", "Listening for changes to the sugarcrm directory...".dimmed());

    wait_for_shutdown().await
}

/// Waits for Ctrl-C
pub async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    println!("{}", "Shutting down".yellow());
    Ok(())
}
