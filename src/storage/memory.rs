//! In-process backup storage
//!
//! Keeps objects in a map. Same commit semantics as the S3 store: a
//! stream that fails partway leaves no object behind.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::RwLock;

use super::BackupStore;
use crate::api::RecordingStream;
use crate::error::AppError;

/// A committed object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Map-backed store
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    /// Committed keys in lexicographic order
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    async fn commit(&self, key: &str, content_type: &str, data: Vec<u8>) {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
    }
}

#[async_trait]
impl BackupStore for MemoryStore {
    async fn put_stream(
        &self,
        key: &str,
        content_type: &str,
        mut body: RecordingStream,
    ) -> Result<u64, AppError> {
        let mut data = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                AppError::Download(format!("failed to read recording stream: {}", e))
            })?;
            data.extend_from_slice(&chunk);
        }

        let written = data.len() as u64;
        self.commit(key, content_type, data).await;
        Ok(written)
    }

    async fn put_bytes(
        &self,
        key: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<(), AppError> {
        self.commit(key, content_type, data).await;
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, AppError> {
        Ok(self.keys().await)
    }
}
