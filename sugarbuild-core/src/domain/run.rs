//! Pipeline run domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    DependencyInstall,
    Compile,
    WriteConfig,
    AssetBuild,
    DbProvision,
    Install,
    ConvertDump,
    ImportData,
    Watch,
    Finish,
}

impl Stage {
    /// All stages in the order a run visits them
    pub const ORDER: [Stage; 10] = [
        Stage::DependencyInstall,
        Stage::Compile,
        Stage::WriteConfig,
        Stage::AssetBuild,
        Stage::DbProvision,
        Stage::Install,
        Stage::ConvertDump,
        Stage::ImportData,
        Stage::Watch,
        Stage::Finish,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::DependencyInstall => "dependency-install",
            Stage::Compile => "compile",
            Stage::WriteConfig => "write-config",
            Stage::AssetBuild => "asset-build",
            Stage::DbProvision => "db-provision",
            Stage::Install => "install",
            Stage::ConvertDump => "convert-dump",
            Stage::ImportData => "import-data",
            Stage::Watch => "watch",
            Stage::Finish => "finish",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Success,
    Failed,
    /// The install never completed within the rerun budget
    RerunExhausted,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Success => write!(f, "success"),
            RunOutcome::Failed => write!(f, "failed"),
            RunOutcome::RerunExhausted => write!(f, "rerun-exhausted"),
        }
    }
}

/// One execution of the stage sequence for a (branch, flavor) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    /// Branch checked out by the scheduler, `None` for standalone builds
    pub branch: Option<String>,
    pub flavor: String,
    pub started_at: DateTime<Utc>,
    pub stage: Stage,
    /// Restarts caused by incomplete installs
    pub reruns: u32,
    pub outcome: Option<RunOutcome>,
}

impl PipelineRun {
    pub fn new(branch: Option<String>, flavor: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            branch,
            flavor: flavor.into(),
            started_at: Utc::now(),
            stage: Stage::DependencyInstall,
            reruns: 0,
            outcome: None,
        }
    }

    /// Moves the run to `stage`
    ///
    /// Stages only move forward; use [`PipelineRun::restart`] to go back
    /// to the first stage.
    pub fn enter(&mut self, stage: Stage) {
        debug_assert!(stage >= self.stage, "stage {} after {}", stage, self.stage);
        self.stage = stage;
    }

    /// Returns the run to the first stage and counts the rerun
    pub fn restart(&mut self) {
        self.stage = Stage::DependencyInstall;
        self.reruns += 1;
    }

    pub fn finish(&mut self, outcome: RunOutcome) {
        self.outcome = Some(outcome);
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Wall-clock time since the run started, clamped at zero
    pub fn elapsed(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.started_at).to_std().unwrap_or_default()
    }
}
