//! Wave-based batch submitter
//!
//! Rows are submitted in waves of at most `wave_size`. Every row in a wave is
//! an independent future; the wave is awaited as a whole with `join_all`, so
//! a failing row neither cancels nor delays its siblings, and no more than
//! `wave_size` calls are ever outstanding. Waves never overlap.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::identity::{RecordId, RecordKind};

use super::progress::ProgressTracker;
use super::remote::{
    AssetInput, AssetLogInput, AssetService, CacheInvalidator, LogDefaults, NoopInvalidator,
    RemoteError,
};
use super::row::{ImportRow, StagedRow};
use super::session::SubmissionBatch;

pub use crate::core::config::DEFAULT_WAVE_SIZE;

/// Writes one row to wherever rows of its kind are stored
#[async_trait]
pub trait RowWriter<R>: Send + Sync {
    /// Returns the identifier of the written record
    async fn write_row(&self, row: &R) -> Result<String, RemoteError>;
}

/// Asset writes: the primary create or update followed by the dependent log
/// entry. Either failing fails the row.
pub struct AssetWriter {
    service: Arc<dyn AssetService>,
    log_defaults: LogDefaults,
}

impl AssetWriter {
    pub fn new(service: Arc<dyn AssetService>) -> Self {
        Self {
            service,
            log_defaults: LogDefaults::default(),
        }
    }

    pub fn with_log_defaults(mut self, log_defaults: LogDefaults) -> Self {
        self.log_defaults = log_defaults;
        self
    }
}

#[async_trait]
impl RowWriter<ImportRow> for AssetWriter {
    async fn write_row(&self, row: &ImportRow) -> Result<String, RemoteError> {
        let input = AssetInput::from(row);
        let asset_id = if row.is_update {
            self.service.update_asset(&input).await?
        } else {
            self.service.create_asset(&input).await?
        };

        let log = AssetLogInput {
            id: RecordId::new(RecordKind::Log).to_string(),
            asset_id: asset_id.clone(),
            comment: if row.is_update {
                self.log_defaults.comment_updated.clone()
            } else {
                self.log_defaults.comment_created.clone()
            },
            status: self.log_defaults.status,
        };
        self.service.insert_log(&log).await?;
        Ok(asset_id)
    }
}

/// Outcome of one row in one wave
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchResult<R = ImportRow> {
    Imported { id: String, is_update: bool },
    Failed { row: R, message: String },
}

/// Everything the router needs once the submitter has stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport<R = ImportRow> {
    /// Rows handed to the submitter
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    /// Failed rows, each carrying its failure as its error message
    pub failed: Vec<R>,
    /// Rows never launched because the drain was cancelled
    pub unsubmitted: Vec<R>,
    pub waves: usize,
    pub cancelled: bool,
}

impl<R> Default for DrainReport<R> {
    fn default() -> Self {
        Self {
            total: 0,
            created: 0,
            updated: 0,
            failed: Vec::new(),
            unsubmitted: Vec::new(),
            waves: 0,
            cancelled: false,
        }
    }
}

impl<R> DrainReport<R> {
    pub fn imported(&self) -> usize {
        self.created + self.updated
    }
}

pub struct BatchSubmitter<R = ImportRow> {
    writer: Arc<dyn RowWriter<R>>,
    invalidator: Arc<dyn CacheInvalidator>,
    wave_size: usize,
}

impl<R: StagedRow> BatchSubmitter<R> {
    pub fn new(writer: Arc<dyn RowWriter<R>>) -> Self {
        Self {
            writer,
            invalidator: Arc::new(NoopInvalidator),
            wave_size: DEFAULT_WAVE_SIZE,
        }
    }

    pub fn with_wave_size(mut self, wave_size: usize) -> Self {
        self.wave_size = wave_size.max(1);
        self
    }

    pub fn with_invalidator(mut self, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        self.invalidator = invalidator;
        self
    }

    pub fn wave_size(&self) -> usize {
        self.wave_size
    }

    /// Submit every row, wave by wave, until none remain or `cancel` fires.
    ///
    /// Cancellation is only observed between waves; a launched wave always
    /// settles.
    pub async fn drain(
        &self,
        batch: SubmissionBatch<R>,
        tracker: &mut ProgressTracker,
        cancel: &CancellationToken,
    ) -> DrainReport<R> {
        let mut remaining = batch.into_rows();
        let mut report = DrainReport {
            total: remaining.len(),
            ..Default::default()
        };

        info!(rows = report.total, wave_size = self.wave_size, "starting import");

        while !remaining.is_empty() {
            if cancel.is_cancelled() {
                warn!(unsubmitted = remaining.len(), "import cancelled between waves");
                report.cancelled = true;
                report.unsubmitted = remaining;
                break;
            }

            let take = self.wave_size.min(remaining.len());
            let wave: Vec<R> = remaining.drain(..take).collect();
            report.waves += 1;
            debug!(wave = report.waves, rows = wave.len(), "launching wave");

            let results = join_all(wave.into_iter().map(|row| self.submit_row(row))).await;

            for result in results {
                match result {
                    BatchResult::Imported { is_update: true, .. } => report.updated += 1,
                    BatchResult::Imported { is_update: false, .. } => report.created += 1,
                    BatchResult::Failed { row, message } => {
                        report.failed.push(row.with_error(message))
                    }
                }
            }

            self.invalidator.invalidate();
            let snapshot = tracker.record_wave(remaining.len(), report.failed.len());
            info!(
                wave = report.waves,
                remaining = snapshot.remaining,
                failed = snapshot.failed,
                percent = snapshot.display_percent(),
                "wave settled"
            );

            tokio::task::yield_now().await;
        }

        report
    }

    async fn submit_row(&self, row: R) -> BatchResult<R> {
        match self.writer.write_row(&row).await {
            Ok(id) => {
                debug!(
                    row_id = %row.id(),
                    record_id = %id,
                    line = row.line_number(),
                    "row imported"
                );
                BatchResult::Imported {
                    id,
                    is_update: row.is_update(),
                }
            }
            Err(e) => {
                let message = e.row_message();
                info!(row_id = %row.id(), line = row.line_number(), error = %e, "row failed");
                BatchResult::Failed { row, message }
            }
        }
    }
}
