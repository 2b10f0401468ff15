//! Database dump domain types
//!
//! Dumps are named `<branch>_<flavor>.sql` and live in the dump directory.
//! Exported dumps carry placeholder tokens instead of the license key and
//! database name so they can be shared between hosts.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder standing in for the license key inside shared dumps
pub const LICENSE_KEY_TOKEN: &str = "{{LICENSE_KEY}}";

/// Placeholder standing in for the database name inside shared dumps
pub const DB_NAME_TOKEN: &str = "{{DB_NAME}}";

/// Dump file extension, including the dot
pub const DUMP_EXTENSION: &str = ".sql";

/// Dump file name without the extension, as used by `importDumpFile`
pub fn dump_stem(branch: &str, flavor: &str) -> String {
    format!("{}_{}", branch, flavor)
}

/// File name of the dump for a branch and flavor
pub fn dump_file_name(branch: &str, flavor: &str) -> String {
    format!("{}{}", dump_stem(branch, flavor), DUMP_EXTENSION)
}

/// Splits a dump file name into `(branch, flavor)`
///
/// Returns `None` for names that do not follow `<branch>_<flavor>.sql`.
pub fn parse_dump_file_name(file_name: &str) -> Option<(&str, &str)> {
    let stem = file_name.strip_suffix(DUMP_EXTENSION)?;
    let (branch, flavor) = stem.rsplit_once('_')?;
    if branch.is_empty() || flavor.is_empty() {
        return None;
    }
    Some((branch, flavor))
}

/// A dump file found in the dump directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpFile {
    pub path: PathBuf,
    pub branch: String,
    pub flavor: String,
    /// File name without the extension
    pub stem: String,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

/// Renders a byte count as `Bytes`, `KB`, `MB`, `GB` or `TB`
pub fn human_size(bytes: u64) -> String {
    const SIZES: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Byte".to_string();
    }

    let bytes = bytes as f64;
    let exponent = ((bytes.ln() / 1024f64.ln()).floor() as usize).min(SIZES.len() - 1);
    let scaled = (bytes / 1024f64.powi(exponent as i32)).round();
    format!("{} {}", scaled, SIZES[exponent])
}

/// Renders how long ago something happened ("a few seconds ago", "3 hours ago")
pub fn relative_time(elapsed: TimeDelta) -> String {
    let seconds = elapsed.num_seconds().max(0) as f64;
    let minutes = (seconds / 60.0).round();
    let hours = (seconds / 3600.0).round();
    let days = (seconds / 86_400.0).round();

    let phrase = if seconds < 45.0 {
        "a few seconds".to_string()
    } else if seconds < 90.0 {
        "a minute".to_string()
    } else if minutes < 45.0 {
        format!("{} minutes", minutes)
    } else if minutes < 90.0 {
        "an hour".to_string()
    } else if hours < 22.0 {
        format!("{} hours", hours)
    } else if hours < 36.0 {
        "a day".to_string()
    } else if days < 26.0 {
        format!("{} days", days)
    } else if days < 45.0 {
        "a month".to_string()
    } else if days < 320.0 {
        format!("{} months", (days / 30.0).round())
    } else if days < 548.0 {
        "a year".to_string()
    } else {
        format!("{} years", (days / 365.0).round())
    };

    format!("{} ago", phrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_file_name_round_trip() {
        let name = dump_file_name("7_9_feature", "ent");
        assert_eq!(name, "7_9_feature_ent.sql");
        assert_eq!(parse_dump_file_name(&name), Some(("7_9_feature", "ent")));
    }

    #[test]
    fn test_parse_rejects_unrelated_files() {
        assert_eq!(parse_dump_file_name("notes.txt"), None);
        assert_eq!(parse_dump_file_name("nounderscore.sql"), None);
        assert_eq!(parse_dump_file_name("_ent.sql"), None);
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 Byte");
        assert_eq!(human_size(512), "512 Bytes");
        assert_eq!(human_size(2048), "2 KB");
        assert_eq!(human_size(5 * 1024 * 1024 + 300_000), "5 MB");
        assert_eq!(human_size(3 * 1024u64.pow(4)), "3 TB");
    }

    #[test]
    fn test_relative_time() {
        assert_eq!(relative_time(TimeDelta::seconds(3)), "a few seconds ago");
        assert_eq!(relative_time(TimeDelta::seconds(-30)), "a few seconds ago");
        assert_eq!(relative_time(TimeDelta::seconds(70)), "a minute ago");
        assert_eq!(relative_time(TimeDelta::minutes(10)), "10 minutes ago");
        assert_eq!(relative_time(TimeDelta::minutes(60)), "an hour ago");
        assert_eq!(relative_time(TimeDelta::hours(5)), "5 hours ago");
        assert_eq!(relative_time(TimeDelta::hours(30)), "a day ago");
        assert_eq!(relative_time(TimeDelta::days(4)), "4 days ago");
        assert_eq!(relative_time(TimeDelta::days(800)), "2 years ago");
    }
}
