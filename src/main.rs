//! RecSync binary entry point

use std::process::ExitCode;

use recsync::{SyncJob, config, error::AppError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Steps
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging
/// 3. Initialize metrics
/// 4. Build the sync job and run it once
/// 5. Write the metrics textfile
#[tokio::main]
async fn main() -> ExitCode {
    // 1. Load configuration
    let config = match config::AppConfig::load() {
        Ok(config) => config,
        Err(error) => {
            init_tracing(&config::LoggingConfig::default());
            tracing::error!(%error, "Invalid configuration");
            return ExitCode::from(error.exit_code());
        }
    };

    // 2. Initialize tracing/logging
    init_tracing(&config.logging);
    tracing::info!("Starting RecSync...");

    // 3. Initialize metrics
    recsync::metrics::init_metrics();

    let textfile_path = config.metrics.textfile_path.clone();
    let result = run(config).await;

    // 5. Write metrics even for failed runs
    if let Some(path) = textfile_path {
        match recsync::metrics::write_textfile(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Metrics written"),
            Err(error) => tracing::warn!(%error, path = %path.display(), "Failed to write metrics"),
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "Sync run failed");
            ExitCode::from(error.exit_code())
        }
    }
}

/// 4. Build the job and run it once
async fn run(config: config::AppConfig) -> Result<(), AppError> {
    tracing::info!(
        api = %config.api.base_url,
        bucket = config.storage.bucket.as_deref().unwrap_or_default(),
        deadline_seconds = config.sync.deadline_seconds,
        "Configuration loaded"
    );

    let job = SyncJob::new(config)?;
    let report = job.run().await?;

    if report.files_failed > 0 || report.deletions_failed > 0 {
        tracing::warn!(
            failed = report.files_failed,
            deletions_failed = report.deletions_failed,
            "Sync completed with failures"
        );
    } else {
        tracing::info!(transferred = report.files_transferred, "Sync completed");
    }
    Ok(())
}

fn init_tracing(logging: &config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("recsync={}", logging.level).into());

    if logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
