//! Retention client
//!
//! Deletes a meeting's cloud recordings once they are backed up.

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{ApiEndpoint, RetentionEnforcer};
use crate::error::AppError;

/// Issues recording deletions against the remote API
#[derive(Debug, Clone)]
pub struct RetentionClient {
    endpoint: ApiEndpoint,
}

impl RetentionClient {
    pub fn new(endpoint: ApiEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl RetentionEnforcer for RetentionClient {
    async fn delete_recordings(&self, meeting_id: &str) -> Result<(), AppError> {
        let url = self.endpoint.url(&format!(
            "/meetings/{}/recordings",
            urlencoding::encode(meeting_id)
        ));

        let response = self
            .endpoint
            .http_client
            .delete(&url)
            .header("Accept", "application/json")
            .bearer_auth(self.endpoint.credential.expose())
            .send()
            .await
            .map_err(|e| AppError::Retention(format!("failed to delete recordings: {}", e)))?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Retention(format!(
                "invalid delete recordings response code: {} -- {}",
                status, body
            )));
        }

        Ok(())
    }
}
