//! Install wizard progress
//!
//! The install driver prints the wizard's progress as free text. A
//! [`ProgressObserver`] turns that text into completed milestones; an
//! [`InstallSink`] connects an observer to the running driver process.

mod sink;
mod tracker;

pub use sink::{HEARTBEAT_INTERVAL, InstallSink};
pub use tracker::{MilestoneTracker, ProgressObserver};
