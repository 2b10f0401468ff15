//! Version manifest DTO

use serde::{Deserialize, Serialize};

/// The published package manifest; only the version is read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionManifest {
    pub version: String,
}

impl VersionManifest {
    /// Whether the published version differs from `local`
    pub fn differs_from(&self, local: &str) -> bool {
        self.version.trim() != local.trim()
    }
}
