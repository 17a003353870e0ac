//! Error types for RecSync
//!
//! Every failure in the pipeline is expressed as an `AppError`.
//! Fatal categories carry a distinct process exit code; per-file and
//! per-meeting categories are logged by the orchestrator and never
//! escape a run.

use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or deserialized
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more options are missing or invalid
    #[error("Invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    /// Remote API or storage credential could not be built
    #[error("Credential error: {0}")]
    Credential(String),

    /// Recording catalog could not be fetched or parsed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Recording file could not be downloaded
    #[error("Download error: {0}")]
    Download(String),

    /// Object storage write, commit or listing failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Storage key could not be derived from meeting attributes
    #[error("Format error: {0}")]
    Format(String),

    /// Remote recordings could not be deleted
    #[error("Retention error: {0}")]
    Retention(String),

    /// Static bucket index could not be published
    #[error("Index error: {0}")]
    Index(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// The run did not finish within the configured deadline
    #[error("Run exceeded deadline of {0:?}")]
    DeadlineExceeded(std::time::Duration),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Process exit code for an error that aborts the run
    ///
    /// Values follow `sysexits.h` where a category fits.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::InvalidConfig(_) => 78,
            AppError::Credential(_) => 77,
            AppError::Catalog(_) | AppError::HttpClient(_) => 69,
            AppError::DeadlineExceeded(_) => 75,
            _ => 1,
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn invalid_config_lists_every_problem() {
        let error = AppError::InvalidConfig(vec![
            "api.user_id is required".to_string(),
            "storage.bucket is required".to_string(),
        ]);

        let message = error.to_string();
        assert!(message.contains("api.user_id is required"));
        assert!(message.contains("storage.bucket is required"));
    }

    #[test]
    fn fatal_categories_have_distinct_exit_codes() {
        let codes = [
            AppError::InvalidConfig(Vec::new()).exit_code(),
            AppError::Credential("bad".to_string()).exit_code(),
            AppError::Catalog("down".to_string()).exit_code(),
            AppError::DeadlineExceeded(std::time::Duration::from_secs(1)).exit_code(),
        ];

        assert_eq!(codes, [78, 77, 69, 75]);
        assert_eq!(AppError::Storage("x".to_string()).exit_code(), 1);
    }
}
