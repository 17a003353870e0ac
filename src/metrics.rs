//! Prometheus metrics registry and instruments.
//!
//! A run is a short-lived batch job, so the registry is written out once
//! at the end in text exposition format for a node-exporter textfile
//! collector instead of being scraped.

use std::path::Path;

use lazy_static::lazy_static;
use prometheus::{Gauge, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::AppError;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Catalog Metrics
    pub static ref MEETINGS_TOTAL: IntCounter = IntCounter::new(
        "recsync_meetings_total",
        "Total number of meetings returned by the catalog"
    ).expect("metric can be created");

    // Transfer Metrics
    pub static ref TRANSFERS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("recsync_transfers_total", "Total number of recording transfers"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref BYTES_TRANSFERRED_TOTAL: IntCounter = IntCounter::new(
        "recsync_bytes_transferred_total",
        "Total bytes written to backup storage"
    ).expect("metric can be created");

    // Retention Metrics
    pub static ref DELETIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("recsync_deletions_total", "Total number of remote recording deletions"),
        &["outcome"]
    ).expect("metric can be created");

    // Index Metrics
    pub static ref INDEX_PUBLISHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("recsync_index_publishes_total", "Total number of bucket index publishes"),
        &["outcome"]
    ).expect("metric can be created");

    // Run Metrics
    pub static ref RUN_DURATION_SECONDS: Gauge = Gauge::new(
        "recsync_run_duration_seconds",
        "Duration of the last run in seconds"
    ).expect("metric can be created");
    pub static ref LAST_SUCCESS_TIMESTAMP_SECONDS: Gauge = Gauge::new(
        "recsync_last_success_timestamp_seconds",
        "Unix time of the last run that fetched the catalog"
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    let collectors: Vec<(&str, Box<dyn prometheus::core::Collector>)> = vec![
        ("MEETINGS_TOTAL", Box::new(MEETINGS_TOTAL.clone())),
        ("TRANSFERS_TOTAL", Box::new(TRANSFERS_TOTAL.clone())),
        ("BYTES_TRANSFERRED_TOTAL", Box::new(BYTES_TRANSFERRED_TOTAL.clone())),
        ("DELETIONS_TOTAL", Box::new(DELETIONS_TOTAL.clone())),
        ("INDEX_PUBLISHES_TOTAL", Box::new(INDEX_PUBLISHES_TOTAL.clone())),
        ("RUN_DURATION_SECONDS", Box::new(RUN_DURATION_SECONDS.clone())),
        (
            "LAST_SUCCESS_TIMESTAMP_SECONDS",
            Box::new(LAST_SUCCESS_TIMESTAMP_SECONDS.clone()),
        ),
    ];

    for (name, collector) in collectors {
        if let Err(error) = REGISTRY.register(collector) {
            tracing::warn!(metric = name, %error, "Failed to register metric");
        }
    }

    tracing::debug!("Metrics registry initialized");
}

/// Encode the registry in Prometheus text format
pub fn render() -> Result<String, AppError> {
    TextEncoder::new()
        .encode_to_string(&REGISTRY.gather())
        .map_err(|e| AppError::Internal(e.into()))
}

/// Write the registry to `path` atomically
///
/// The collector may read at any time, so the file is written next to
/// the target and renamed into place.
pub fn write_textfile(path: &Path) -> Result<(), AppError> {
    let text = render()?;
    let temp_path = path.with_extension("prom.tmp");

    std::fs::write(&temp_path, text).map_err(|e| AppError::Internal(e.into()))?;
    std::fs::rename(&temp_path, path).map_err(|e| AppError::Internal(e.into()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textfile_contains_registered_metrics() {
        init_metrics();
        TRANSFERS_TOTAL.with_label_values(&["transferred"]).inc();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recsync.prom");
        write_textfile(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("recsync_transfers_total{outcome=\"transferred\"}"));
        assert!(!dir.path().join("recsync.prom.tmp").exists());
    }
}
