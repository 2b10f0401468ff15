//! Dump download endpoint

use crate::SugarbuildClient;
use crate::error::{ClientError, Result};
use tracing::debug;

/// Body prefix a dump host answers with when it has no such dump
pub const NO_DATA_FILE_PREFIX: &str = "No data file";

impl SugarbuildClient {
    /// URL of the dump for a branch and flavor
    pub fn dump_url(&self, branch: &str, flavor: &str) -> String {
        format!("{}/data/{}_{}", self.base_url, branch, flavor)
    }

    /// Download the dump for a branch and flavor
    ///
    /// # Arguments
    /// * `branch` - Branch the dump was exported from
    /// * `flavor` - Build flavor of the dump
    ///
    /// # Returns
    /// The dump text, still carrying its placeholder tokens
    pub async fn fetch_dump(&self, branch: &str, flavor: &str) -> Result<String> {
        if branch.trim().is_empty() {
            return Err(ClientError::InvalidRequest(
                "branch cannot be empty".to_string(),
            ));
        }

        let url = self.dump_url(branch, flavor);
        debug!("Fetching dump from {}", url);

        let response = self.client.get(&url).send().await?;
        let body = self.handle_text_response(response).await?;

        check_dump_body(body, branch, flavor)
    }
}

/// Rejects the host's "no data file" answer
fn check_dump_body(body: String, branch: &str, flavor: &str) -> Result<String> {
    if body.starts_with(NO_DATA_FILE_PREFIX) {
        return Err(ClientError::NotFound(format!("{}_{}", branch, flavor)));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_url() {
        let client = SugarbuildClient::new("http://builds.local/build/");
        assert_eq!(
            client.dump_url("master", "pro"),
            "http://builds.local/build/data/master_pro"
        );
    }

    #[test]
    fn test_no_data_file_body_is_not_found() {
        let err = check_dump_body(
            "No data file for (master_ent) found.".to_string(),
            "master",
            "ent",
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_dump_body_passes_through() {
        let body = "CREATE DATABASE `{{DB_NAME}}`;".to_string();
        assert_eq!(check_dump_body(body.clone(), "master", "ent").unwrap(), body);
    }

    #[tokio::test]
    async fn test_empty_branch_is_rejected_before_request() {
        let client = SugarbuildClient::new("http://127.0.0.1:9");
        let err = client.fetch_dump("  ", "ent").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }
}
