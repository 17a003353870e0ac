//! Recording download client
//!
//! Download links take the bearer token as an `access_token` query
//! parameter rather than a header.

use async_trait::async_trait;
use futures::TryStreamExt;

use super::{ApiEndpoint, RecordingSource, RecordingStream};
use crate::error::AppError;

/// Streams recording files from their download URLs
#[derive(Debug, Clone)]
pub struct DownloadClient {
    endpoint: ApiEndpoint,
}

impl DownloadClient {
    pub fn new(endpoint: ApiEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl RecordingSource for DownloadClient {
    async fn open(&self, download_url: &str) -> Result<RecordingStream, AppError> {
        let response = self
            .endpoint
            .http_client
            .get(download_url)
            .query(&[("access_token", self.endpoint.credential.expose())])
            .send()
            .await
            .map_err(|e| {
                AppError::Download(format!("failed to request recording download: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Download(format!(
                "invalid recording download response code: {}",
                status
            )));
        }

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::pin(stream))
    }
}
