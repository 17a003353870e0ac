//! RecSync - back up cloud meeting recordings into object storage
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Remote API Layer                         │
//! │  - Recording catalog                                        │
//! │  - Streaming downloads                                      │
//! │  - Recording deletion                                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Key derivation                                           │
//! │  - Bounded transfer pool and retention                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Storage Layer                            │
//! │  - S3-compatible bucket (multipart streaming)               │
//! │  - Static bucket index                                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP clients for the recordings API
//! - `auth`: Bearer token signing
//! - `service`: Sync orchestration
//! - `data`: Domain models
//! - `storage`: Backup bucket and index page
//! - `metrics`: Prometheus instruments
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;

use std::sync::Arc;

/// One configured sync job
///
/// Holds every client a run needs; building it performs no network I/O.
#[derive(Clone)]
pub struct SyncJob {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Wired orchestrator
    pub orchestrator: service::SyncOrchestrator,
}

impl SyncJob {
    /// Build a job that writes to the configured S3-compatible bucket
    ///
    /// # Errors
    /// Returns error if credentials or clients cannot be built
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let store = storage::S3Store::new(&config.storage)?;
        tracing::info!("Backup storage initialized");
        Self::with_store(config, Arc::new(store))
    }

    /// Build a job around an existing store
    ///
    /// # Steps
    /// 1. Build the shared HTTP client
    /// 2. Resolve the bearer credential
    /// 3. Wire catalog, download and retention clients
    /// 4. Attach the index publisher when enabled
    pub fn with_store(
        config: config::AppConfig,
        store: Arc<dyn storage::BackupStore>,
    ) -> Result<Self, error::AppError> {
        let http_client = Arc::new(api::build_http_client(&config.http)?);

        let credential = auth::AuthMode::from_config(&config.api)?.credential()?;
        let endpoint = api::ApiEndpoint::new(http_client, &config.api.base_url, credential);

        let user_id = config::present(&config.api.user_id)
            .ok_or_else(|| error::AppError::Config("api.user_id is required".to_string()))?;
        let catalog = api::CatalogClient::new(
            endpoint.clone(),
            user_id,
            config.api.lookback_months,
        );
        let download = api::DownloadClient::new(endpoint.clone());
        let retention = api::RetentionClient::new(endpoint);

        let keys = service::KeyPolicy::new(config.storage.layout, config.storage.prefix.as_deref());
        let options = service::SyncOptions {
            concurrency: config.sync.concurrency,
            retention_policy: config.sync.retention_policy,
        };

        let mut orchestrator = service::SyncOrchestrator::new(
            Arc::new(catalog),
            service::TransferEngine::new(Arc::new(download), store.clone()),
            Arc::new(retention),
            keys,
            options,
        );

        if config.index.enabled {
            let bucket = config::present(&config.storage.bucket).unwrap_or_default();
            orchestrator = orchestrator.with_index(storage::IndexPublisher::new(
                store,
                bucket,
                config.index.object_name.clone(),
                config.index.title.clone(),
            ));
        }

        tracing::info!(
            concurrency = options.concurrency,
            retention_policy = ?options.retention_policy,
            index = config.index.enabled,
            "Sync job initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            orchestrator,
        })
    }

    /// Run once, bounded by the configured deadline
    ///
    /// # Errors
    /// `Catalog` when the catalog cannot be fetched, `DeadlineExceeded`
    /// when the deadline elapses first
    pub async fn run(&self) -> Result<service::RunReport, error::AppError> {
        match self.config.sync.deadline() {
            Some(deadline) => tokio::time::timeout(deadline, self.orchestrator.run())
                .await
                .map_err(|_| error::AppError::DeadlineExceeded(deadline))?,
            None => self.orchestrator.run().await,
        }
    }
}
