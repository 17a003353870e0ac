//! Recording catalog client
//!
//! Lists a user's cloud recordings for the lookback window.

use async_trait::async_trait;
use chrono::{DateTime, Months, NaiveDate, Utc};

use super::{ApiEndpoint, RecordingCatalog, RecordingListResponse};
use crate::data::Meeting;
use crate::error::AppError;

/// Catalog client for one user
#[derive(Debug, Clone)]
pub struct CatalogClient {
    endpoint: ApiEndpoint,
    user_id: String,
    lookback_months: u32,
}

/// First day of the catalog window
///
/// The window is open-ended towards now.
pub fn catalog_window_start(now: DateTime<Utc>, lookback_months: u32) -> NaiveDate {
    let today = now.date_naive();
    today
        .checked_sub_months(Months::new(lookback_months))
        .unwrap_or(today)
}

impl CatalogClient {
    pub fn new(endpoint: ApiEndpoint, user_id: impl Into<String>, lookback_months: u32) -> Self {
        Self {
            endpoint,
            user_id: user_id.into(),
            lookback_months,
        }
    }

    /// Fetch meetings recorded since `from`
    ///
    /// # Errors
    /// Transport errors, non-2xx responses and malformed bodies
    pub async fn fetch_since(&self, from: NaiveDate) -> Result<Vec<Meeting>, AppError> {
        let url = self.endpoint.url(&format!(
            "/users/{}/recordings",
            urlencoding::encode(&self.user_id)
        ));
        let from = from.format("%Y-%m-%d").to_string();

        tracing::info!(user_id = %self.user_id, from = %from, "Fetching recordings catalog");

        let response = self
            .endpoint
            .http_client
            .get(&url)
            .query(&[("from", from.as_str())])
            .header("Accept", "application/json")
            .bearer_auth(self.endpoint.credential.expose())
            .send()
            .await
            .map_err(|e| AppError::Catalog(format!("failed to request recordings: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::Catalog(format!("failed to read recordings response body: {}", e))
        })?;

        if !status.is_success() {
            return Err(AppError::Catalog(format!(
                "invalid recordings response code {}: {}",
                status, body
            )));
        }

        let parsed: RecordingListResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::Catalog(format!("failed to parse recordings response: {}", e))
        })?;
        let meetings = parsed.into_meetings();

        tracing::info!(
            meetings = meetings.len(),
            files = meetings.iter().map(|m| m.files.len()).sum::<usize>(),
            "Recordings catalog fetched"
        );

        Ok(meetings)
    }
}

#[async_trait]
impl RecordingCatalog for CatalogClient {
    async fn list_meetings(&self) -> Result<Vec<Meeting>, AppError> {
        self.fetch_since(catalog_window_start(Utc::now(), self.lookback_months))
            .await
    }
}
