//! Scheduler layer for the runner
//!
//! Builds every configured branch in both flavors on a fixed interval.
//! Passes never overlap: a pass holds the run permit until its last build
//! finishes, whatever the outcome.

pub mod branches;

pub use branches::{BranchScheduler, PassReport, PassRun};
