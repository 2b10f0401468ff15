use std::io;
use std::path::{Component, Path, PathBuf};
use sugarbuild_core::domain::config::BuildConfig;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("path {0} escapes the watched tree")]
    OutsideTree(PathBuf),

    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

fn io_error(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> SyncError {
    let path = path.to_path_buf();
    move |source| SyncError::Io {
        action,
        path,
        source,
    }
}

/// What a source path currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEntry {
    File,
    Directory,
    Absent,
}

/// Result of mirroring one path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Copied { cache_cleared: bool },
    DirectoryEnsured,
    RemovedFile,
    RemovedDirectory,
    /// Neither the source nor the output exists
    AlreadyAbsent,
    /// The event named the tree root itself
    Ignored,
}

/// Mirrors paths of the source tree into the output tree
#[derive(Debug, Clone)]
pub struct FileSync {
    source_root: PathBuf,
    output_root: PathBuf,
    cache_dir: PathBuf,
    invalidating_extensions: Vec<String>,
}

impl FileSync {
    pub fn new(source_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            cache_dir: PathBuf::new(),
            invalidating_extensions: Vec::new(),
        }
    }

    /// Clears `cache_dir` (relative to the output root) after copying a
    /// file with one of `extensions`
    pub fn with_cache_invalidation(
        mut self,
        extensions: Vec<String>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        self.invalidating_extensions = extensions;
        self.cache_dir = cache_dir.into();
        self
    }

    /// Mirrors the application tree into the active flavor's output tree
    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.sugar_dir(), config.flavor_output_dir()).with_cache_invalidation(
            config.cache_invalidating_extensions.clone(),
            config.cache_dir.clone(),
        )
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Determines what `path` is right now, without following symlinks
    pub async fn probe(path: &Path) -> Result<SourceEntry, SyncError> {
        match tokio::fs::symlink_metadata(path).await {
            Ok(meta) if meta.is_dir() => Ok(SourceEntry::Directory),
            Ok(_) => Ok(SourceEntry::File),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SourceEntry::Absent),
            Err(e) => Err(io_error("inspect", path)(e)),
        }
    }

    /// Brings the output copy of `relative` in line with the source
    ///
    /// The source is probed at the time of the call, so a stale event for
    /// a path that has since changed kind still converges.
    pub async fn sync(&self, relative: &Path) -> Result<SyncOutcome, SyncError> {
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(SyncError::OutsideTree(relative.to_path_buf()));
        }
        if relative.as_os_str().is_empty() {
            return Ok(SyncOutcome::Ignored);
        }

        let source = self.source_root.join(relative);
        match Self::probe(&source).await? {
            SourceEntry::File => self.copy_file(relative, &source).await,
            SourceEntry::Directory => {
                let target = self.output_root.join(relative);
                tokio::fs::create_dir_all(&target)
                    .await
                    .map_err(io_error("create", &target))?;
                Ok(SyncOutcome::DirectoryEnsured)
            }
            SourceEntry::Absent => self.remove_output(relative).await,
        }
    }

    async fn copy_file(&self, relative: &Path, source: &Path) -> Result<SyncOutcome, SyncError> {
        let target = self.output_root.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_error("create", parent))?;
        }

        match tokio::fs::copy(source, &target).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} vanished before copy", source.display());
                return self.remove_output(relative).await;
            }
            Err(e) => return Err(io_error("copy", source)(e)),
        }

        let cache_cleared = self.invalidates_cache(relative) && self.clear_cache().await;
        Ok(SyncOutcome::Copied { cache_cleared })
    }

    async fn remove_output(&self, relative: &Path) -> Result<SyncOutcome, SyncError> {
        let target = self.output_root.join(relative);
        match Self::probe(&target).await? {
            SourceEntry::Absent => Ok(SyncOutcome::AlreadyAbsent),
            SourceEntry::Directory => match tokio::fs::remove_dir_all(&target).await {
                Ok(()) => Ok(SyncOutcome::RemovedDirectory),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SyncOutcome::AlreadyAbsent),
                Err(e) => Err(io_error("remove", &target)(e)),
            },
            SourceEntry::File => match tokio::fs::remove_file(&target).await {
                Ok(()) => Ok(SyncOutcome::RemovedFile),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SyncOutcome::AlreadyAbsent),
                Err(e) => Err(io_error("remove", &target)(e)),
            },
        }
    }

    fn invalidates_cache(&self, relative: &Path) -> bool {
        if self.cache_dir.as_os_str().is_empty() {
            return false;
        }
        relative
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.invalidating_extensions.iter().any(|e| e == ext))
    }

    /// Removes the cache directory; failures are logged, never raised
    async fn clear_cache(&self) -> bool {
        let cache = self.output_root.join(&self.cache_dir);
        match tokio::fs::remove_dir_all(&cache).await {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!("Failed to clear cache {}: {}", cache.display(), e);
                false
            }
        }
    }
}
