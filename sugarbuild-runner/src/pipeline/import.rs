use async_trait::async_trait;
use sugarbuild_client::{ClientError, SugarbuildClient};
use tracing::debug;

/// Fetches portable dumps published by another host's dashboard
#[async_trait]
pub trait DumpSource: Send + Sync {
    async fn fetch_dump(&self, host: &str, branch: &str, flavor: &str) -> Result<String, ClientError>;
}

/// Fetches dumps over HTTP from the host's dashboard
#[derive(Debug, Clone, Default)]
pub struct HttpDumpSource;

#[async_trait]
impl DumpSource for HttpDumpSource {
    async fn fetch_dump(&self, host: &str, branch: &str, flavor: &str) -> Result<String, ClientError> {
        debug!("Fetching dump {}_{} from {}", branch, flavor, host);
        SugarbuildClient::new(host.to_string())
            .fetch_dump(branch, flavor)
            .await
    }
}
