//! Dump listing DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::dump::{DumpFile, human_size, relative_time};

/// A dump file as listed by the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpSummary {
    /// Branch the dump was exported from
    pub name: String,
    pub flavor: String,
    /// File name without the extension, as used in download links
    pub filename: String,
    /// Modification time relative to the listing time
    pub modified: String,
    /// Human-readable size
    pub filesize: String,
}

impl DumpSummary {
    /// Summarizes a dump file relative to `now`
    pub fn from_file(file: &DumpFile, now: DateTime<Utc>) -> Self {
        Self {
            name: file.branch.clone(),
            flavor: file.flavor.clone(),
            filename: file.stem.clone(),
            modified: relative_time(now - file.modified),
            filesize: human_size(file.size),
        }
    }
}
