//! Dump portability and branch naming
//!
//! Exported dumps have the license key and database name swapped for
//! placeholder tokens; imports swap them back for the local values.

use std::path::PathBuf;
use sugarbuild_core::domain::config::BuildConfig;
use sugarbuild_core::domain::dump::{DB_NAME_TOKEN, DUMP_EXTENSION, LICENSE_KEY_TOKEN, dump_file_name};

/// Which substitutions found something to replace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Substitution {
    pub license_key: bool,
    pub database_name: bool,
}

fn replace(text: &str, needle: &str, replacement: &str) -> (String, bool) {
    if needle.is_empty() || !text.contains(needle) {
        return (text.to_string(), false);
    }
    (text.replace(needle, replacement), true)
}

/// Replaces the license key and database name with placeholder tokens
pub fn to_placeholders(dump: &str, license_key: &str, database: &str) -> (String, Substitution) {
    let (text, license_found) = replace(dump, license_key, LICENSE_KEY_TOKEN);
    let (text, database_found) = replace(&text, database, DB_NAME_TOKEN);
    (
        text,
        Substitution {
            license_key: license_found,
            database_name: database_found,
        },
    )
}

/// Replaces placeholder tokens with the local license key and database name
pub fn to_real(dump: &str, license_key: &str, database: &str) -> (String, Substitution) {
    let (text, license_found) = replace(dump, LICENSE_KEY_TOKEN, license_key);
    let (text, database_found) = replace(&text, DB_NAME_TOKEN, database);
    (
        text,
        Substitution {
            license_key: license_found,
            database_name: database_found,
        },
    )
}

/// Where the dump of `branch` for the active flavor is written
pub fn dump_path(config: &BuildConfig, branch: &str) -> PathBuf {
    config.sql_dump_dir.join(dump_file_name(branch, &config.flavor))
}

/// Path of a local dump named by its stem (`importDumpFile`)
pub fn local_dump_path(config: &BuildConfig, stem: &str) -> PathBuf {
    config
        .sql_dump_dir
        .join(format!("{}{}", stem, DUMP_EXTENSION))
}

/// Extracts the checked-out branch from `git branch` output
pub fn parse_current_branch(git_branch_output: &str) -> Option<String> {
    git_branch_output
        .lines()
        .find_map(|line| line.trim_start().strip_prefix('*'))
        .map(clean_branch_name)
        .filter(|name| !name.is_empty())
}

/// Normalizes a branch label for use in file names
///
/// `(HEAD detached at upstream/7_9)` becomes `7_9`; a remote prefix is
/// dropped at the first `/`.
pub fn clean_branch_name(raw: &str) -> String {
    let name = raw.replace("HEAD detached at", "");
    let name = match name.split_once('/') {
        Some((_, rest)) => rest,
        None => name.as_str(),
    };
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '(' && *c != ')')
        .collect()
}
