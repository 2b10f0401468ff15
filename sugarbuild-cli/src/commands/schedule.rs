//! Scheduled build command handler

use anyhow::Result;
use std::sync::Arc;
use sugarbuild_core::domain::config::BuildConfig;
use sugarbuild_runner::command::CommandRunner;
use sugarbuild_runner::{BranchScheduler, BuildPipeline, SharedConfig, ShellCommandRunner};

use super::serve::spawn_dashboard;
use super::watch::wait_for_shutdown;
use crate::summary;

/// Builds every configured branch on the schedule until interrupted
pub async fn run_schedule(config: BuildConfig) -> Result<()> {
    summary::print_config_summary(&config);
    let _dashboard = spawn_dashboard(&config);

    let runner: Arc<dyn CommandRunner> = Arc::new(ShellCommandRunner::new(config.verbose));
    let pipeline = Arc::new(BuildPipeline::new(runner.clone()));
    let scheduler = BranchScheduler::new(SharedConfig::new(config), pipeline, runner);

    tokio::select! {
        _ = scheduler.run() => Ok(()),
        result = wait_for_shutdown() => result,
    }
}
