//! Dump Service
//!
//! Lists and reads the dumps in the dump directory.

use chrono::{DateTime, Utc};
use std::io;
use std::path::Path;
use sugarbuild_core::domain::dump::{DUMP_EXTENSION, DumpFile, dump_stem, parse_dump_file_name};

/// Service error type
#[derive(Debug)]
pub enum DumpError {
    InvalidName(String),
    Io(io::Error),
}

impl From<io::Error> for DumpError {
    fn from(err: io::Error) -> Self {
        DumpError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, DumpError>;

/// Lists the dumps in `dir`, sorted by file name
///
/// Hidden files and files not named `<branch>_<flavor>.sql` are skipped.
/// A missing directory lists as empty.
pub async fn list_dumps(dir: &Path) -> Result<Vec<DumpFile>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let Some((branch, flavor)) = parse_dump_file_name(name) else {
            tracing::debug!("Skipping {} in dump directory", name);
            continue;
        };

        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        files.push(DumpFile {
            path: entry.path(),
            branch: branch.to_string(),
            flavor: flavor.to_string(),
            stem: dump_stem(branch, flavor),
            modified,
            size: meta.len(),
        });
    }

    files.sort_by(|a, b| a.stem.cmp(&b.stem));
    Ok(files)
}

/// Reads the dump named by its stem (`<branch>_<flavor>`)
///
/// Returns `None` when no such dump exists.
pub async fn read_dump(dir: &Path, stem: &str) -> Result<Option<String>> {
    validate_stem(stem)?;

    let path = dir.join(format!("{}{}", stem, DUMP_EXTENSION));
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn validate_stem(stem: &str) -> Result<()> {
    if stem.trim().is_empty() {
        return Err(DumpError::InvalidName("Branch cannot be empty".to_string()));
    }

    if stem.starts_with('.') || stem.contains('/') || stem.contains('\\') {
        return Err(DumpError::InvalidName(format!(
            "Invalid branch name: {}",
            stem
        )));
    }

    Ok(())
}
