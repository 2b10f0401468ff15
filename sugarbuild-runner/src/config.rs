//! Shared configuration handle
//!
//! One [`BuildConfig`] is shared by the pipeline, the watcher and the
//! scheduler. The scheduler writes it between runs (branch, flavor, dump
//! stem); the pipeline takes a snapshot at the start of every attempt and
//! the watcher re-reads it for every event.

use std::path::Path;
use std::sync::Arc;
use sugarbuild_core::domain::config::{BuildConfig, ConfigError};
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SharedConfig(Arc<RwLock<BuildConfig>>);

impl SharedConfig {
    pub fn new(config: BuildConfig) -> Self {
        Self(Arc::new(RwLock::new(config)))
    }

    /// Copy of the current settings
    pub async fn snapshot(&self) -> BuildConfig {
        self.0.read().await.clone()
    }

    /// Mutates the settings in place
    pub async fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut BuildConfig),
    {
        let mut config = self.0.write().await;
        change(&mut config);
    }
}

/// Loads, overrides and validates the configuration
///
/// A missing file yields the defaults. Override keys that name no setting
/// are logged and skipped.
pub fn load_config(
    path: &Path,
    overrides: &[(String, String)],
) -> Result<BuildConfig, ConfigError> {
    let mut config = if path.exists() {
        let config = BuildConfig::load(path)?;
        info!("Loaded configuration from {}", path.display());
        config
    } else {
        info!("No config file at {}, using defaults", path.display());
        BuildConfig::default()
    };

    for key in config.apply_overrides(overrides)? {
        warn!("Ignoring unknown setting '{}'", key);
    }

    if config.enable_build_schedule && config.watch_changes {
        info!("Watching is disabled while the build schedule is enabled");
        config.watch_changes = false;
    }

    config.validate()?;
    Ok(config)
}
