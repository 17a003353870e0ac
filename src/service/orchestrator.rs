//! Sync orchestrator
//!
//! Drives one run: fetch the catalog, transfer every eligible file of
//! every meeting, then apply the retention policy per meeting and
//! optionally publish the bucket index.
//!
//! ```text
//! Start -> CatalogFetched
//!       -> per meeting: per file: Requesting -> Copying -> Committed | Failed
//!                       then RetentionRequested
//!       -> Done
//! ```
//!
//! Only a catalog failure aborts the run. File and deletion failures are
//! logged and counted; there is no retry.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::{KeyPolicy, TransferEngine};
use crate::api::{RecordingCatalog, RetentionEnforcer};
use crate::config::RetentionPolicy;
use crate::data::Meeting;
use crate::error::AppError;
use crate::metrics::{
    BYTES_TRANSFERRED_TOTAL, DELETIONS_TOTAL, INDEX_PUBLISHES_TOTAL,
    LAST_SUCCESS_TIMESTAMP_SECONDS, MEETINGS_TOTAL, RUN_DURATION_SECONDS, TRANSFERS_TOTAL,
};
use crate::storage::IndexPublisher;

/// Run-level knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Upper bound on in-flight transfers
    pub concurrency: usize,
    pub retention_policy: RetentionPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retention_policy: RetentionPolicy::Always,
        }
    }
}

/// Totals of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub meetings: usize,
    pub files_attempted: usize,
    pub files_transferred: usize,
    pub files_failed: usize,
    pub bytes_transferred: u64,
    pub deletions_requested: usize,
    pub deletions_failed: usize,
    pub deletions_skipped: usize,
    /// `None` when index publishing is disabled
    pub index_published: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeletionOutcome {
    Deleted,
    Failed,
    Skipped,
}

impl DeletionOutcome {
    fn label(self) -> &'static str {
        match self {
            DeletionOutcome::Deleted => "deleted",
            DeletionOutcome::Failed => "failed",
            DeletionOutcome::Skipped => "skipped",
        }
    }
}

#[derive(Debug)]
struct MeetingOutcome {
    transferred: usize,
    failed: usize,
    bytes: u64,
    deletion: DeletionOutcome,
}

impl RunReport {
    fn absorb(&mut self, outcome: MeetingOutcome) {
        self.files_attempted += outcome.transferred + outcome.failed;
        self.files_transferred += outcome.transferred;
        self.files_failed += outcome.failed;
        self.bytes_transferred += outcome.bytes;
        match outcome.deletion {
            DeletionOutcome::Deleted => self.deletions_requested += 1,
            DeletionOutcome::Failed => {
                self.deletions_requested += 1;
                self.deletions_failed += 1;
            }
            DeletionOutcome::Skipped => self.deletions_skipped += 1,
        }
    }
}

/// Sync orchestrator
#[derive(Clone)]
pub struct SyncOrchestrator {
    catalog: Arc<dyn RecordingCatalog>,
    transfer: TransferEngine,
    retention: Arc<dyn RetentionEnforcer>,
    keys: KeyPolicy,
    index: Option<IndexPublisher>,
    options: SyncOptions,
}

impl SyncOrchestrator {
    pub fn new(
        catalog: Arc<dyn RecordingCatalog>,
        transfer: TransferEngine,
        retention: Arc<dyn RetentionEnforcer>,
        keys: KeyPolicy,
        options: SyncOptions,
    ) -> Self {
        Self {
            catalog,
            transfer,
            retention,
            keys,
            index: None,
            options,
        }
    }

    /// Publish the bucket index after every run
    pub fn with_index(mut self, index: IndexPublisher) -> Self {
        self.index = Some(index);
        self
    }

    /// Perform one run
    ///
    /// # Errors
    /// Only catalog failures; nothing has been transferred or deleted then
    pub async fn run(&self) -> Result<RunReport, AppError> {
        let started = Instant::now();

        let meetings = self.catalog.list_meetings().await?;
        MEETINGS_TOTAL.inc_by(meetings.len() as u64);

        let concurrency = self.options.concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut report = RunReport {
            meetings: meetings.len(),
            ..RunReport::default()
        };

        let outcomes: Vec<MeetingOutcome> = futures::stream::iter(meetings)
            .map(|meeting| self.process_meeting(meeting, semaphore.clone()))
            .buffer_unordered(concurrency)
            .collect()
            .await;
        for outcome in outcomes {
            report.absorb(outcome);
        }

        if let Some(index) = &self.index {
            let published = match index.publish().await {
                Ok(_) => true,
                Err(error) => {
                    tracing::error!(%error, "Failed to publish bucket index");
                    false
                }
            };
            INDEX_PUBLISHES_TOTAL
                .with_label_values(&[if published { "published" } else { "failed" }])
                .inc();
            report.index_published = Some(published);
        }

        RUN_DURATION_SECONDS.set(started.elapsed().as_secs_f64());
        LAST_SUCCESS_TIMESTAMP_SECONDS.set(chrono::Utc::now().timestamp() as f64);

        tracing::info!(
            meetings = report.meetings,
            transferred = report.files_transferred,
            failed = report.files_failed,
            bytes = report.bytes_transferred,
            deletions = report.deletions_requested,
            deletions_failed = report.deletions_failed,
            deletions_skipped = report.deletions_skipped,
            "Sync run finished"
        );

        Ok(report)
    }

    /// Transfer every file of a meeting, then apply retention
    ///
    /// Transfers run in a `JoinSet`; dropping this future aborts them.
    async fn process_meeting(&self, meeting: Meeting, semaphore: Arc<Semaphore>) -> MeetingOutcome {
        let mut tasks = JoinSet::new();

        for (index, file) in meeting.files.iter().enumerate() {
            let key = self.keys.key_for(&meeting, file);
            let engine = self.transfer.clone();
            let semaphore = semaphore.clone();
            let file = file.clone();

            tasks.spawn(async move {
                let result: Result<u64, AppError> = async {
                    let key = key?;
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| AppError::Internal(e.into()))?;
                    engine.transfer(&file, &key).await
                }
                .await;
                (index, result)
            });
        }

        let mut outcome = MeetingOutcome {
            transferred: 0,
            failed: 0,
            bytes: 0,
            deletion: DeletionOutcome::Skipped,
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(bytes))) => {
                    outcome.transferred += 1;
                    outcome.bytes += bytes;
                    TRANSFERS_TOTAL.with_label_values(&["transferred"]).inc();
                    BYTES_TRANSFERRED_TOTAL.inc_by(bytes);
                }
                Ok((index, Err(error))) => {
                    outcome.failed += 1;
                    TRANSFERS_TOTAL.with_label_values(&["failed"]).inc();
                    let file = meeting
                        .files
                        .get(index)
                        .map(|file| file.file_name())
                        .unwrap_or_default();
                    tracing::error!(
                        meeting_id = %meeting.id,
                        file = %file,
                        %error,
                        "Recording transfer failed"
                    );
                }
                Err(join_error) => {
                    outcome.failed += 1;
                    TRANSFERS_TOTAL.with_label_values(&["failed"]).inc();
                    tracing::error!(
                        meeting_id = %meeting.id,
                        error = %join_error,
                        "Recording transfer task aborted"
                    );
                }
            }
        }

        outcome.deletion = self.enforce_retention(&meeting, outcome.failed).await;
        DELETIONS_TOTAL
            .with_label_values(&[outcome.deletion.label()])
            .inc();
        outcome
    }

    async fn enforce_retention(&self, meeting: &Meeting, failed: usize) -> DeletionOutcome {
        match self.options.retention_policy {
            RetentionPolicy::Never => {
                tracing::info!(meeting_id = %meeting.id, "Retention disabled; keeping remote recordings");
                return DeletionOutcome::Skipped;
            }
            RetentionPolicy::OnFullSuccess if failed > 0 => {
                tracing::warn!(
                    meeting_id = %meeting.id,
                    failed,
                    "Keeping remote recordings; not every file was backed up"
                );
                return DeletionOutcome::Skipped;
            }
            _ => {}
        }

        tracing::info!(meeting_id = %meeting.id, "Deleting remote recordings");
        match self.retention.delete_recordings(&meeting.id).await {
            Ok(()) => {
                tracing::info!(meeting_id = %meeting.id, "Remote recordings deleted");
                DeletionOutcome::Deleted
            }
            Err(error) => {
                tracing::error!(meeting_id = %meeting.id, %error, "Failed to delete remote recordings");
                DeletionOutcome::Failed
            }
        }
    }
}
