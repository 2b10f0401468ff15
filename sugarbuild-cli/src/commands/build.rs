//! Single build command handler

use anyhow::{Context, Result};
use std::sync::Arc;
use sugarbuild_core::domain::config::BuildConfig;
use sugarbuild_runner::{BuildPipeline, SharedConfig, ShellCommandRunner};

use super::serve::spawn_dashboard;
use super::watch::wait_for_shutdown;
use crate::summary;

/// Builds the configured flavor once
///
/// Keeps running afterwards while the watcher or the dashboard is active.
pub async fn run_build(config: BuildConfig) -> Result<()> {
    summary::print_config_summary(&config);
    let dashboard = spawn_dashboard(&config);
    let stay_alive = config.watch_changes || dashboard.is_some();

    let runner = Arc::new(ShellCommandRunner::new(config.verbose));
    let pipeline = BuildPipeline::new(runner);
    let shared = SharedConfig::new(config);

    let report = pipeline.run(&shared).await.context("Build failed")?;
    summary::print_run_report(&report);

    if stay_alive {
        wait_for_shutdown().await?;
    }
    Ok(())
}
