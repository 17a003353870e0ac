//! Remote recordings API
//!
//! HTTP clients for:
//! - Recording catalog (list a user's meetings)
//! - Recording download (stream one file)
//! - Retention (delete a meeting's recordings)
//!
//! Each concern is a trait so the orchestrator can be driven by fakes.

mod catalog;
mod download;
mod dto;
mod retention;

pub use catalog::{CatalogClient, catalog_window_start};
pub use download::DownloadClient;
pub use dto::*;
pub use retention::RetentionClient;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::auth::Credential;
use crate::data::Meeting;
use crate::error::AppError;

/// Byte stream of a recording file
pub type RecordingStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// Lists meetings eligible for backup
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordingCatalog: Send + Sync {
    /// Fetch the catalog window and filter to eligible files
    ///
    /// # Errors
    /// Any failure aborts the run; no partial catalog is returned
    async fn list_meetings(&self) -> Result<Vec<Meeting>, AppError>;
}

/// Opens recording downloads
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordingSource: Send + Sync {
    /// Open a streaming read of one recording file
    async fn open(&self, download_url: &str) -> Result<RecordingStream, AppError>;
}

/// Deletes recordings from the remote service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RetentionEnforcer: Send + Sync {
    /// Delete every recording of a meeting
    ///
    /// Irreversible on success.
    async fn delete_recordings(&self, meeting_id: &str) -> Result<(), AppError>;
}

/// Shared connection details of the remote API
#[derive(Debug, Clone)]
pub struct ApiEndpoint {
    http_client: Arc<reqwest::Client>,
    /// API root without trailing slash
    base_url: String,
    credential: Credential,
}

impl ApiEndpoint {
    pub fn new(
        http_client: Arc<reqwest::Client>,
        base_url: &str,
        credential: Credential,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Build the HTTP client shared by every remote call
///
/// The request timeout covers the whole exchange, streamed body included.
pub fn build_http_client(config: &crate::config::HttpConfig) -> Result<reqwest::Client, AppError> {
    use std::time::Duration;

    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .build()
        .map_err(AppError::HttpClient)
}
