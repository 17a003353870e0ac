//! S3-compatible backup storage
//!
//! Works against AWS S3, Cloudflare R2 and MinIO. Streams are copied
//! through a multipart upload so memory stays bounded by the part size;
//! bodies smaller than one part go out as a single PutObject.

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use futures::StreamExt;

use super::{BackupStore, build_s3_http_client};
use crate::api::RecordingStream;
use crate::config::{StorageConfig, StorageCredentials, present};
use crate::error::AppError;

/// Backup storage on an S3-compatible bucket
pub struct S3Store {
    /// S3-compatible client
    client: S3Client,
    /// Destination bucket name
    bucket: String,
    /// Multipart part size in bytes
    part_size: usize,
}

/// An in-progress multipart upload
struct MultipartUpload {
    upload_id: String,
    parts: Vec<CompletedPart>,
}

impl S3Store {
    /// Create new storage client
    ///
    /// # Errors
    /// Returns `Credential` if no storage credentials are available
    pub fn new(config: &StorageConfig) -> Result<Self, AppError> {
        use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

        let bucket = present(&config.bucket)
            .ok_or_else(|| AppError::Config("storage.bucket is required".to_string()))?;

        let resolved = resolve_credentials(config)?;
        let credentials = Credentials::new(
            resolved.access_key_id,
            resolved.secret_access_key,
            resolved.session_token,
            None,
            "recsync-storage",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .http_client(build_s3_http_client())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(config.force_path_style);
        if let Some(endpoint) = present(&config.endpoint) {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: S3Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
            part_size: config.part_size_bytes(),
        })
    }

    /// Copy the stream, opening a multipart upload once a full part is buffered
    async fn copy_stream(
        &self,
        key: &str,
        content_type: &str,
        body: &mut RecordingStream,
        upload: &mut Option<MultipartUpload>,
    ) -> Result<u64, AppError> {
        let mut buffer: Vec<u8> = Vec::with_capacity(self.part_size);
        let mut total: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                AppError::Download(format!("failed to read recording stream: {}", e))
            })?;
            total += chunk.len() as u64;
            buffer.extend_from_slice(&chunk);

            if buffer.len() >= self.part_size {
                let part = std::mem::replace(&mut buffer, Vec::with_capacity(self.part_size));
                if upload.is_none() {
                    *upload = Some(self.begin_multipart(key, content_type).await?);
                }
                if let Some(current) = upload.as_mut() {
                    self.upload_part(key, current, part).await?;
                }
            }
        }

        match upload {
            None => {
                tracing::info!(key = %key, bytes = total, "Closing upload");
                self.put_bytes(key, content_type, buffer).await?;
            }
            Some(current) => {
                if !buffer.is_empty() {
                    self.upload_part(key, current, buffer).await?;
                }
                tracing::info!(key = %key, bytes = total, parts = current.parts.len(), "Closing upload");
                self.complete_multipart(key, current).await?;
            }
        }

        Ok(total)
    }

    async fn begin_multipart(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<MultipartUpload, AppError> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to start upload: {}", e)))?;

        let upload_id = output
            .upload_id
            .ok_or_else(|| AppError::Storage("Upload started without an upload id".to_string()))?;

        tracing::debug!(key = %key, "Multipart upload started");
        Ok(MultipartUpload {
            upload_id,
            parts: Vec::new(),
        })
    }

    async fn upload_part(
        &self,
        key: &str,
        upload: &mut MultipartUpload,
        data: Vec<u8>,
    ) -> Result<(), AppError> {
        let part_number = i32::try_from(upload.parts.len() + 1)
            .map_err(|_| AppError::Storage("Too many upload parts".to_string()))?;

        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(&upload.upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Part upload failed: {}", e)))?;

        upload.parts.push(
            CompletedPart::builder()
                .set_e_tag(output.e_tag)
                .part_number(part_number)
                .build(),
        );
        Ok(())
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload: &MultipartUpload,
    ) -> Result<(), AppError> {
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(upload.parts.clone()))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(&upload.upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to commit upload: {}", e)))?;

        tracing::debug!(key = %key, "Multipart upload committed");
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, upload: &MultipartUpload) {
        let result = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(&upload.upload_id)
            .send()
            .await;

        match result {
            Ok(_) => tracing::debug!(key = %key, "Multipart upload aborted"),
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "Failed to abort multipart upload")
            }
        }
    }
}

#[async_trait]
impl BackupStore for S3Store {
    async fn put_stream(
        &self,
        key: &str,
        content_type: &str,
        mut body: RecordingStream,
    ) -> Result<u64, AppError> {
        let mut upload = None;
        let result = self
            .copy_stream(key, content_type, &mut body, &mut upload)
            .await;

        if result.is_err() {
            if let Some(upload) = upload.as_ref() {
                self.abort_multipart(key, upload).await;
            }
        }

        result
    }

    async fn put_bytes(
        &self,
        key: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload failed: {}", e)))?;

        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, AppError> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| AppError::Storage(format!("Failed to list objects: {}", e)))?;

            if let Some(contents) = output.contents {
                keys.extend(contents.into_iter().filter_map(|object| object.key));
            }

            match output.next_continuation_token {
                Some(next) => continuation_token = Some(next),
                None => break,
            }
        }

        Ok(keys)
    }
}

/// Credentials from configuration, else from the ambient environment
fn resolve_credentials(config: &StorageConfig) -> Result<StorageCredentials, AppError> {
    if let Some(credentials) = config
        .explicit_credentials()
        .map_err(AppError::Credential)?
    {
        return Ok(credentials);
    }

    ambient_credentials().ok_or_else(|| {
        AppError::Credential(
            "no storage credentials: set storage.credentials_json, storage.access_key_id and \
             storage.secret_access_key, or AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY"
                .to_string(),
        )
    })
}

fn ambient_credentials() -> Option<StorageCredentials> {
    let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

    Some(StorageCredentials {
        access_key_id: non_empty("AWS_ACCESS_KEY_ID")?,
        secret_access_key: non_empty("AWS_SECRET_ACCESS_KEY")?,
        session_token: non_empty("AWS_SESSION_TOKEN"),
    })
}
