//! Branch scheduler
//!
//! Wakes up every poll interval and, once the pass interval has elapsed,
//! walks the branch list: check out the branch, then build each flavor
//! with `importDumpFile` pointing at that branch's dump.

use chrono::Local;
use std::sync::Arc;
use sugarbuild_core::domain::config::FLAVORS;
use sugarbuild_core::domain::dump::dump_stem;
use sugarbuild_core::domain::run::RunOutcome;
use tokio::sync::Semaphore;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::command::{CommandRunner, quote};
use crate::config::SharedConfig;
use crate::error::PipelineError;
use crate::pipeline::{BuildExecutor, RunReport};

/// One build of a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassRun {
    pub branch: String,
    pub flavor: String,
    pub outcome: RunOutcome,
}

/// Outcome of one walk over the branch list
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub runs: Vec<PassRun>,
}

impl PassReport {
    pub fn failures(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| r.outcome != RunOutcome::Success)
            .count()
    }
}

/// Builds every branch on an interval
pub struct BranchScheduler {
    config: SharedConfig,
    executor: Arc<dyn BuildExecutor>,
    runner: Arc<dyn CommandRunner>,
    permit: Arc<Semaphore>,
}

impl BranchScheduler {
    pub fn new(
        config: SharedConfig,
        executor: Arc<dyn BuildExecutor>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            executor,
            runner,
            permit: Arc::new(Semaphore::new(1)),
        }
    }

    /// Whether a pass is in progress
    pub fn is_running(&self) -> bool {
        self.permit.available_permits() == 0
    }

    /// Starts the scheduling loop; never returns
    ///
    /// The first pass starts immediately. Each following pass starts on
    /// the first wake-up at least one interval after the previous pass
    /// started.
    pub async fn run(&self) {
        let settings = self.config.snapshot().await;
        let interval = settings.schedule_interval();
        let poll = settings.schedule_poll_interval();
        info!(
            "Build schedule enabled: {} branch(es) every {:?}",
            settings.branches.len(),
            interval
        );

        let mut next_run = Instant::now();
        let mut ticker = time::interval(poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if Instant::now() < next_run {
                continue;
            }

            let started = Instant::now();
            match self.try_run_pass().await {
                Some(report) => {
                    next_run = started + interval;
                    let wait = next_run.saturating_duration_since(Instant::now());
                    let at = Local::now() + chrono::Duration::from_std(wait).unwrap_or_default();
                    info!(
                        "Pass finished with {} failure(s); next run scheduled for {}",
                        report.failures(),
                        at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
                None => debug!("Pass already in progress"),
            }
        }
    }

    /// Runs one pass unless another pass holds the run permit
    pub async fn try_run_pass(&self) -> Option<PassReport> {
        let _permit = self.permit.clone().try_acquire_owned().ok()?;
        Some(self.run_pass().await)
    }

    /// Builds every branch once, in order, in every flavor
    ///
    /// A failing build is recorded and the pass moves on.
    async fn run_pass(&self) -> PassReport {
        let snapshot = self.config.snapshot().await;
        let mut report = PassReport::default();

        for (index, branch) in snapshot.branches.iter().enumerate() {
            if index > 0 {
                let delay = snapshot.branch_delay();
                info!("Next build will begin in {} seconds...", delay.as_secs());
                time::sleep(delay).await;
            }

            let switched = match self.switch_branch(branch).await {
                Ok(()) => {
                    info!("Branch switched to {}", branch);
                    true
                }
                Err(e) => {
                    error!("Failed to switch to branch {}: {}", branch, e);
                    false
                }
            };

            for flavor in FLAVORS {
                let outcome = if switched {
                    self.build_flavor(branch, flavor).await
                } else {
                    RunOutcome::Failed
                };
                report.runs.push(PassRun {
                    branch: branch.clone(),
                    flavor: flavor.to_string(),
                    outcome,
                });
            }
        }

        report
    }

    async fn switch_branch(&self, branch: &str) -> Result<(), PipelineError> {
        let source_dir = self.config.snapshot().await.source_dir;
        let branch = quote(branch);
        self.runner
            .run(&format!(
                "cd {}; git fetch; git checkout {}; git pull; git submodule update",
                quote(&source_dir.to_string_lossy()),
                branch
            ))
            .await?;
        Ok(())
    }

    async fn build_flavor(&self, branch: &str, flavor: &str) -> RunOutcome {
        let stem = dump_stem(branch, flavor);
        self.config
            .update(|config| {
                config.current_branch = branch.to_string();
                config.flavor = flavor.to_string();
                config.import_dump_file = stem;
            })
            .await;
        info!("Flavor set to {}", flavor);

        outcome_of(self.executor.execute(&self.config).await, branch, flavor)
    }
}

fn outcome_of(result: Result<RunReport, PipelineError>, branch: &str, flavor: &str) -> RunOutcome {
    match result {
        Ok(report) => {
            info!(
                "Built {} ({}) in {:.0} seconds",
                branch,
                flavor,
                report.elapsed.as_secs_f64()
            );
            report.run.outcome.unwrap_or(RunOutcome::Success)
        }
        Err(PipelineError::RerunsExhausted(limit)) => {
            warn!("Gave up on {} ({}) after {} reruns", branch, flavor, limit);
            RunOutcome::RerunExhausted
        }
        Err(e) => {
            error!("Build of {} ({}) failed: {}", branch, flavor, e);
            RunOutcome::Failed
        }
    }
}
