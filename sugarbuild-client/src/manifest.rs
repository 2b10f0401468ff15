//! Version manifest endpoint

use crate::SugarbuildClient;
use crate::error::Result;
use sugarbuild_core::dto::manifest::VersionManifest;

impl SugarbuildClient {
    /// Fetch a package manifest
    ///
    /// The manifest lives outside the dump host, so `url` is absolute.
    pub async fn fetch_manifest(&self, url: &str) -> Result<VersionManifest> {
        let response = self.client.get(url).send().await?;

        self.handle_response(response).await
    }
}
