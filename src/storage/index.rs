//! Static bucket index
//!
//! Renders one link per object into a fixed-name HTML page stored in the
//! same bucket. Links are plain `http://<bucket>/<key>` URLs and assume
//! the bucket is publicly readable; nothing here signs URLs.

use std::sync::Arc;

use super::BackupStore;
use crate::error::AppError;

const INDEX_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Publishes the bucket index page
#[derive(Clone)]
pub struct IndexPublisher {
    store: Arc<dyn BackupStore>,
    bucket: String,
    object_name: String,
    title: String,
}

impl IndexPublisher {
    pub fn new(
        store: Arc<dyn BackupStore>,
        bucket: impl Into<String>,
        object_name: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            object_name: object_name.into(),
            title: title.into(),
        }
    }

    /// List the bucket and overwrite the index page
    ///
    /// # Returns
    /// Number of links written
    pub async fn publish(&self) -> Result<usize, AppError> {
        let keys = self
            .store
            .list_keys()
            .await
            .map_err(|e| AppError::Index(format!("failed to list bucket {}: {}", self.bucket, e)))?;

        let html = render_index(&self.title, &self.bucket, &keys);

        self.store
            .put_bytes(&self.object_name, INDEX_CONTENT_TYPE, html.into_bytes())
            .await
            .map_err(|e| AppError::Index(format!("failed to write {}: {}", self.object_name, e)))?;

        tracing::info!(
            object = %self.object_name,
            links = keys.len(),
            "Bucket index published"
        );
        Ok(keys.len())
    }
}

/// Render the index page for a list of keys
pub fn render_index(title: &str, bucket: &str, keys: &[String]) -> String {
    use html_escape::{encode_double_quoted_attribute, encode_text};

    let mut html = format!(
        "<html><body><h2>{}</h2><ul>",
        encode_text(title)
    );
    for key in keys {
        let link = format!("http://{}/{}", bucket, encode_key_path(key));
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>",
            encode_double_quoted_attribute(&link),
            encode_text(key)
        ));
    }
    html.push_str("</ul></body></html>");
    html
}

/// Percent-encode each path segment, keeping the separators
fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
