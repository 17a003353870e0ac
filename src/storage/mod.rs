//! Object storage module
//!
//! Handles:
//! - Streaming recording files into the backup bucket (S3-compatible)
//! - Listing the bucket and publishing a static index page
//!
//! Writes are all-or-nothing: an object becomes visible only once its
//! whole body was copied.

mod index;
mod memory;
mod s3;

pub use index::{IndexPublisher, render_index};
pub use memory::{MemoryStore, StoredObject};
pub use s3::S3Store;

use async_trait::async_trait;

use crate::api::RecordingStream;
use crate::error::AppError;

/// Destination bucket for backups
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Create or overwrite `key` from a byte stream
    ///
    /// # Returns
    /// Number of bytes written
    ///
    /// # Errors
    /// On any read or write failure nothing is committed
    async fn put_stream(
        &self,
        key: &str,
        content_type: &str,
        body: RecordingStream,
    ) -> Result<u64, AppError>;

    /// Create or overwrite `key` with an in-memory body
    async fn put_bytes(&self, key: &str, content_type: &str, data: Vec<u8>)
    -> Result<(), AppError>;

    /// Every key in the bucket, following pagination to the end
    async fn list_keys(&self) -> Result<Vec<String>, AppError>;
}

pub(crate) fn build_s3_http_client() -> aws_sdk_s3::config::SharedHttpClient {
    use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build();

    HyperClientBuilder::new().build(https_connector)
}
