//! Startup version check

use colored::*;
use std::time::Duration;
use sugarbuild_client::SugarbuildClient;
use sugarbuild_core::domain::config::BuildConfig;
use sugarbuild_core::dto::manifest::VersionManifest;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Warns when the published version differs from the running one
///
/// Never fails: an unreachable or malformed manifest is only logged.
pub async fn check(config: &BuildConfig) {
    let url = config.version_manifest_url.trim();
    if url.is_empty() {
        return;
    }

    let client = SugarbuildClient::new("");
    let manifest = match tokio::time::timeout(CHECK_TIMEOUT, client.fetch_manifest(url)).await {
        Ok(Ok(manifest)) => manifest,
        Ok(Err(e)) => {
            tracing::warn!("Version check failed: {}", e);
            return;
        }
        Err(_) => {
            tracing::warn!("Version check timed out after {}s", CHECK_TIMEOUT.as_secs());
            return;
        }
    };

    if let Some(notice) = update_notice(&manifest, env!("CARGO_PKG_VERSION")) {
        println!("{}", notice.yellow());
    }
}

fn update_notice(manifest: &VersionManifest, local: &str) -> Option<String> {
    manifest.differs_from(local).then(|| {
        format!(
            "A different sugarbuild version is published ({}, running {}). Please update.",
            manifest.version.trim(),
            local
        )
    })
}
