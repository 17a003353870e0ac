//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (RECSYNC__*, override)
//! 4. Legacy flat environment variables (ZOOM_*, BACKUP_*)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

/// Smallest part size S3 accepts for every part but the last
const MIN_PART_SIZE_MIB: usize = 5;

/// Flat environment variable names accepted as overrides
const LEGACY_ENV_ALIASES: &[(&str, &str)] = &[
    ("ZOOM_API_KEY", "api.api_key"),
    ("ZOOM_API_SECRET", "api.api_secret"),
    ("ZOOM_JWT", "api.token"),
    ("ZOOM_USER_ID", "api.user_id"),
    ("BACKUP_BUCKET", "storage.bucket"),
    ("BACKUP_PATH", "storage.prefix"),
    ("BACKUP_STORAGE_CREDS", "storage.credentials_json"),
];

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    #[serde(default)]
    pub index: IndexConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote recordings API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API root (e.g., "https://api.zoom.us/v2")
    pub base_url: String,
    /// User whose cloud recordings are backed up
    pub user_id: Option<String>,
    /// Key used as the issuer of signed tokens
    pub api_key: Option<String>,
    /// Secret used to sign tokens
    pub api_secret: Option<String>,
    /// Pre-issued bearer token (exclusive with api_key/api_secret)
    pub token: Option<String>,
    /// Lifetime of signed tokens in seconds (default: 2100 = 35 min)
    pub token_ttl_seconds: u64,
    /// Catalog window in months before now (default: 1)
    pub lookback_months: u32,
}

/// Destination object storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Destination bucket name
    pub bucket: Option<String>,
    /// Optional path segment prepended to every key
    pub prefix: Option<String>,
    /// Key layout below the prefix
    #[serde(default)]
    pub layout: KeyLayout,
    /// S3-compatible endpoint (R2, MinIO); AWS when unset
    pub endpoint: Option<String>,
    /// Bucket region ("auto" for R2)
    pub region: String,
    /// Use path-style bucket addressing
    #[serde(default)]
    pub force_path_style: bool,
    /// JSON key material: {"access_key_id", "secret_access_key", "session_token"?}
    pub credentials_json: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Multipart upload part size in MiB (minimum 5)
    pub part_size_mib: usize,
}

/// Key layout below the configured prefix
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyLayout {
    /// `<topic>-<MM-DD-YYYY>/<recording_start>-<recording_type>.<ext>`
    #[default]
    Folder,
    /// `<recording_start>-<recording_type>.<ext>`
    Flat,
}

/// Static storage credentials
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl StorageConfig {
    /// Credentials given in configuration, if any
    ///
    /// JSON key material takes precedence over the explicit key pair.
    /// `Ok(None)` means ambient credentials should be used.
    pub fn explicit_credentials(&self) -> Result<Option<StorageCredentials>, String> {
        if let Some(raw) = present(&self.credentials_json) {
            return serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| format!("storage.credentials_json is not valid key material: {}", e));
        }

        match (present(&self.access_key_id), present(&self.secret_access_key)) {
            (Some(access_key_id), Some(secret_access_key)) => Ok(Some(StorageCredentials {
                access_key_id: access_key_id.to_string(),
                secret_access_key: secret_access_key.to_string(),
                session_token: None,
            })),
            (None, None) => Ok(None),
            _ => Err(
                "storage.access_key_id and storage.secret_access_key must be set together"
                    .to_string(),
            ),
        }
    }

    /// Part size in bytes
    pub fn part_size_bytes(&self) -> usize {
        self.part_size_mib * 1024 * 1024
    }
}

/// Orchestration configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Maximum concurrent transfers (default: 4)
    pub concurrency: usize,
    /// When to delete a meeting's recordings after its transfers
    #[serde(default)]
    pub retention_policy: RetentionPolicy,
    /// Overall wall-clock deadline in seconds; 0 disables (default: 540)
    pub deadline_seconds: u64,
}

impl SyncConfig {
    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_seconds > 0).then(|| Duration::from_secs(self.deadline_seconds))
    }
}

/// Deletion policy for source recordings
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Delete once every file was attempted, whatever the outcome
    #[default]
    Always,
    /// Delete only when every file of the meeting was transferred
    OnFullSuccess,
    /// Never delete (copy-only)
    Never,
}

/// Static bucket index configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Object name of the generated page
    #[serde(default = "default_index_object_name")]
    pub object_name: String,
    /// Page heading
    #[serde(default = "default_index_title")]
    pub title: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            object_name: default_index_object_name(),
            title: default_index_title(),
        }
    }
}

fn default_index_object_name() -> String {
    "biga.html".to_string()
}

fn default_index_title() -> String {
    "Meeting Recordings".to_string()
}

/// Shared HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Connect timeout in seconds (default: 10)
    pub connect_timeout_seconds: u64,
    /// Whole-request timeout in seconds, body included (default: 900)
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}

/// Metrics output configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MetricsConfig {
    /// Write metrics here after the run (textfile collector format)
    pub textfile_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (RECSYNC__*)
    /// 5. Legacy flat environment variables
    ///
    /// # Errors
    /// Returns `InvalidConfig` listing every missing or invalid option
    pub fn load() -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let mut builder = Config::builder()
            .set_default("api.base_url", "https://api.zoom.us/v2")?
            .set_default("api.token_ttl_seconds", 2100)?
            .set_default("api.lookback_months", 1)?
            .set_default("storage.layout", "folder")?
            .set_default("storage.region", "us-east-1")?
            .set_default("storage.force_path_style", false)?
            .set_default("storage.part_size_mib", 8)?
            .set_default("sync.concurrency", 4)?
            .set_default("sync.retention_policy", "always")?
            .set_default("sync.deadline_seconds", 540)?
            .set_default("index.enabled", false)?
            .set_default("http.connect_timeout_seconds", 10)?
            .set_default("http.request_timeout_seconds", 900)?
            .set_default("http.user_agent", "RecSync/0.1.0")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("RECSYNC")
                    .separator("__")
                    .try_parsing(true),
            );

        for (variable, key) in LEGACY_ENV_ALIASES {
            let value = std::env::var(variable).ok().filter(|v| !v.trim().is_empty());
            builder = builder.set_override_option(*key, value)?;
        }

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Check every option and report all problems together
    pub fn validate(&self) -> Result<(), AppError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::InvalidConfig(problems))
        }
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        match url::Url::parse(&self.api.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => problems.push("api.base_url must be an http(s) URL".to_string()),
        }
        if present(&self.api.user_id).is_none() {
            problems.push("api.user_id is required".to_string());
        }

        let key = present(&self.api.api_key);
        let secret = present(&self.api.api_secret);
        let token = present(&self.api.token);
        match (key, secret, token) {
            (_, _, Some(_)) if key.is_some() || secret.is_some() => problems.push(
                "api.token cannot be combined with api.api_key/api.api_secret".to_string(),
            ),
            (None, None, None) => problems.push(
                "either api.token or api.api_key and api.api_secret are required".to_string(),
            ),
            (Some(_), None, None) => {
                problems.push("api.api_secret is required when api.api_key is set".to_string())
            }
            (None, Some(_), None) => {
                problems.push("api.api_key is required when api.api_secret is set".to_string())
            }
            _ => {}
        }
        if self.api.token_ttl_seconds == 0 {
            problems.push("api.token_ttl_seconds must be greater than 0".to_string());
        }
        if self.api.lookback_months == 0 {
            problems.push("api.lookback_months must be at least 1".to_string());
        }

        if present(&self.storage.bucket).is_none() {
            problems.push("storage.bucket is required".to_string());
        }
        if self.storage.part_size_mib < MIN_PART_SIZE_MIB {
            problems.push(format!(
                "storage.part_size_mib must be at least {}",
                MIN_PART_SIZE_MIB
            ));
        }
        if let Err(problem) = self.storage.explicit_credentials() {
            problems.push(problem);
        }

        if self.sync.concurrency == 0 {
            problems.push("sync.concurrency must be at least 1".to_string());
        }

        if self.index.enabled && self.index.object_name.trim().is_empty() {
            problems.push("index.object_name is required when index.enabled=true".to_string());
        }

        if self.http.connect_timeout_seconds == 0 || self.http.request_timeout_seconds == 0 {
            problems.push("http timeouts must be greater than 0".to_string());
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            problems.push("logging.format must be \"pretty\" or \"json\"".to_string());
        }

        problems
    }
}

/// Trimmed, non-empty value of an optional option
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
