use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{FileSync, SyncError, SyncOutcome};
use crate::config::SharedConfig;

/// Starts mirroring the application tree into the active flavor's output
///
/// The watch root is fixed when the watcher starts. The output side is
/// re-read from `config` for every event, so a flavor change redirects
/// later copies. Runs until the process exits.
pub async fn start_watcher(config: SharedConfig) -> Result<JoinHandle<()>, SyncError> {
    let source = config.snapshot().await.sugar_dir();
    let root = tokio::fs::canonicalize(&source)
        .await
        .map_err(|e| SyncError::Io {
            action: "resolve",
            path: source.clone(),
            source: e,
        })?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
        let _ = tx.send(event);
    })
    .map_err(|e| SyncError::Watch {
        path: root.clone(),
        source: e,
    })?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| SyncError::Watch {
            path: root.clone(),
            source: e,
        })?;

    info!("Watching {} for changes", root.display());

    Ok(tokio::spawn(async move {
        let _watcher: RecommendedWatcher = watcher;

        while let Some(event) = rx.recv().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    warn!("Watch error: {}", e);
                    continue;
                }
            };

            if matches!(event.kind, EventKind::Access(_) | EventKind::Other) {
                continue;
            }

            let sync = FileSync::from_config(&config.snapshot().await);
            for path in &event.paths {
                let Some(relative) = relative_to(&root, path) else {
                    debug!("Ignoring event outside the watch root: {}", path.display());
                    continue;
                };

                match sync.sync(&relative).await {
                    Ok(outcome) => log_outcome(&relative, outcome),
                    Err(e) => error!("Failed to sync {}: {}", relative.display(), e),
                }
            }
        }
    }))
}

fn relative_to(root: &Path, path: &Path) -> Option<PathBuf> {
    path.strip_prefix(root).ok().map(Path::to_path_buf)
}

fn log_outcome(relative: &Path, outcome: SyncOutcome) {
    let path = relative.display();
    match outcome {
        SyncOutcome::Copied { cache_cleared } => {
            info!("Copied {}", path);
            if cache_cleared {
                info!("Cache cleared");
            }
        }
        SyncOutcome::DirectoryEnsured => info!("Created directory {}", path),
        SyncOutcome::RemovedFile => info!("Removed {}", path),
        SyncOutcome::RemovedDirectory => info!("Removed directory {}", path),
        SyncOutcome::AlreadyAbsent | SyncOutcome::Ignored => debug!("Nothing to do for {}", path),
    }
}
