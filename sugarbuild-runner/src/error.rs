//! Pipeline errors

use std::path::PathBuf;
use sugarbuild_client::ClientError;
use sugarbuild_core::domain::config::ConfigError;
use sugarbuild_core::domain::run::Stage;
use thiserror::Error;

use crate::command::CommandError;
use crate::sync::SyncError;

/// Errors that end a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A setting needed by a stage is missing or unusable
    #[error("{0}")]
    Setting(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    /// A tool finished without printing its success marker
    #[error("{stage} failed: output did not contain '{marker}'")]
    ToolFailed { stage: Stage, marker: &'static str },

    /// The install driver reported an error on stderr
    #[error("install driver reported an error: {0}")]
    InstallDriver(String),

    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dump was empty where content was required
    #[error("dump file {0} is empty")]
    EmptyDump(PathBuf),

    /// The current branch of the source checkout could not be read
    #[error("could not determine the current branch of {0}")]
    BranchUnknown(PathBuf),

    #[error("failed to fetch remote dump: {0}")]
    Remote(#[from] ClientError),

    /// Import was requested without a local dump or a remote host and branch
    #[error("no import source: set importDumpFile, or both importHost and importBranch")]
    NoImportSource,

    #[error("install did not complete after {0} reruns")]
    RerunsExhausted(u32),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl PipelineError {
    /// Builds a `map_err` adapter for filesystem failures on `path`
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            action,
            path,
            source,
        }
    }
}
