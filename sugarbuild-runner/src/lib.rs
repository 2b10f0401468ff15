//! Sugarbuild Runner
//!
//! The orchestration core that turns a source checkout into a running
//! application instance.
//!
//! Architecture:
//! - Command: external process execution with streamed output capture
//! - Install: milestone tracking over the install driver's output
//! - Pipeline: the ordered, fail-aware build stages and the rerun policy
//! - Sync: mirroring source changes into the output tree
//! - Scheduler: recurring passes over every branch and flavor
//!
//! Every component receives configuration through [`config::SharedConfig`],
//! a single writable descriptor that stages snapshot instead of caching.

pub mod command;
pub mod config;
pub mod error;
pub mod install;
pub mod pipeline;
pub mod scheduler;
pub mod sync;

#[cfg(test)]
mod testing;

pub use command::{CommandOutput, CommandRunner, ShellCommandRunner};
pub use config::SharedConfig;
pub use error::PipelineError;
pub use pipeline::{BuildExecutor, BuildPipeline, RunReport};
pub use scheduler::BranchScheduler;
