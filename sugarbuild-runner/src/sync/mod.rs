//! Source tree mirroring
//!
//! After a build the output tree is kept in step with edits made in the
//! source checkout. [`FileSync`] handles a single changed path;
//! [`start_watcher`] feeds it filesystem events.

mod file_sync;
mod watcher;

pub use file_sync::{FileSync, SourceEntry, SyncError, SyncOutcome};
pub use watcher::start_watcher;
