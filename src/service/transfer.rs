//! File transfer engine
//!
//! Streams one recording from the remote API into the backup bucket.

use std::sync::Arc;

use crate::api::RecordingSource;
use crate::data::RecordingFile;
use crate::error::AppError;
use crate::storage::BackupStore;

/// Copies recording files between source and store
#[derive(Clone)]
pub struct TransferEngine {
    source: Arc<dyn RecordingSource>,
    store: Arc<dyn BackupStore>,
}

impl TransferEngine {
    pub fn new(source: Arc<dyn RecordingSource>, store: Arc<dyn BackupStore>) -> Self {
        Self { source, store }
    }

    /// Copy `file` to `key`
    ///
    /// # Returns
    /// Bytes written
    ///
    /// # Errors
    /// Download, copy or commit failure; the object is not written
    pub async fn transfer(&self, file: &RecordingFile, key: &str) -> Result<u64, AppError> {
        tracing::info!(key = %key, "Requesting recording");
        let body = self.source.open(&file.download_url).await?;

        tracing::info!(key = %key, "Copying recording");
        let bytes = self.store.put_stream(key, file.content_type(), body).await?;

        tracing::info!(key = %key, bytes, "Recording stored");
        Ok(bytes)
    }
}
