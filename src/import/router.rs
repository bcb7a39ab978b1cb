//! Decides what the buffer holds once a drain settles

use super::row::{ImportRow, StagedRow};
use super::submitter::DrainReport;

/// Session notice after some rows failed
pub const PARTIAL_FAILURE_MESSAGE: &str =
    "Some rows could not be imported. Correct them and import again, or export them to a file.";

/// Session notice after the operator cancelled mid-import
pub const CANCELLED_MESSAGE: &str =
    "Import cancelled. Rows that were not submitted are still in the buffer.";

/// Warning attached to rows that were never launched
pub const NOT_SUBMITTED_WARNING: &str = "Not submitted: import cancelled";

/// What the operator is told after a drain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Every row was imported
    Imported { count: usize },
    /// Some rows failed and are back in the buffer
    PartiallyFailed { imported: usize, failed: usize },
    /// The drain stopped early
    Cancelled {
        imported: usize,
        failed: usize,
        unsubmitted: usize,
    },
}

impl RouteOutcome {
    pub fn imported(&self) -> usize {
        match self {
            RouteOutcome::Imported { count } => *count,
            RouteOutcome::PartiallyFailed { imported, .. }
            | RouteOutcome::Cancelled { imported, .. } => *imported,
        }
    }

    pub fn failed(&self) -> usize {
        match self {
            RouteOutcome::Imported { .. } => 0,
            RouteOutcome::PartiallyFailed { failed, .. }
            | RouteOutcome::Cancelled { failed, .. } => *failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RouteOutcome::Imported { .. })
    }
}

/// Result of routing: the outcome plus the new buffer contents
#[derive(Debug)]
pub struct Routed<R = ImportRow> {
    pub outcome: RouteOutcome,
    pub rows: Vec<R>,
    pub message: Option<String>,
}

/// Route a settled drain.
///
/// Only rows the submitter reported as failed are re-admitted (plus, after a
/// cancellation, the rows it never launched).
pub fn route<R: StagedRow>(report: DrainReport<R>) -> Routed<R> {
    let imported = report.imported();
    let failed = report.failed.len();

    if report.cancelled {
        let unsubmitted = report.unsubmitted.len();
        let mut rows = report.failed;
        rows.extend(report.unsubmitted.into_iter().map(|mut row| {
            row.push_warning(NOT_SUBMITTED_WARNING);
            row
        }));
        tracing::info!(imported, failed, unsubmitted, "import cancelled");
        return Routed {
            outcome: RouteOutcome::Cancelled {
                imported,
                failed,
                unsubmitted,
            },
            rows,
            message: Some(CANCELLED_MESSAGE.to_string()),
        };
    }

    if failed == 0 {
        tracing::info!(imported, "import complete");
        return Routed {
            outcome: RouteOutcome::Imported { count: imported },
            rows: Vec::new(),
            message: None,
        };
    }

    tracing::info!(imported, failed, "import finished with failures");
    Routed {
        outcome: RouteOutcome::PartiallyFailed { imported, failed },
        rows: report.failed,
        message: Some(PARTIAL_FAILURE_MESSAGE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: usize) -> ImportRow {
        ImportRow {
            id: format!("AST-{n}"),
            asset_number: format!("A-{n}"),
            catalogue_item_code: Some("FR-100".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_all_succeeded_clears_buffer() {
        let routed = route(DrainReport::<ImportRow> {
            total: 10,
            created: 7,
            updated: 3,
            waves: 1,
            ..Default::default()
        });
        assert_eq!(routed.outcome, RouteOutcome::Imported { count: 10 });
        assert!(routed.rows.is_empty());
        assert!(routed.message.is_none());
    }

    #[test]
    fn test_partial_failure_keeps_exactly_failed_rows() {
        let failed = vec![
            row(4).with_error("AssetNumberAlreadyExists"),
            row(7).with_error("AssetNumberAlreadyExists"),
        ];
        let routed = route(DrainReport {
            total: 10,
            created: 8,
            failed: failed.clone(),
            waves: 1,
            ..Default::default()
        });

        assert_eq!(
            routed.outcome,
            RouteOutcome::PartiallyFailed {
                imported: 8,
                failed: 2
            }
        );
        assert_eq!(routed.rows, failed);
        assert_eq!(routed.message.as_deref(), Some(PARTIAL_FAILURE_MESSAGE));
        assert!(!routed.outcome.is_success());
    }

    #[test]
    fn test_cancelled_keeps_unsubmitted_rows_importable() {
        let routed = route(DrainReport {
            total: 5,
            created: 1,
            failed: vec![row(2).with_error("boom")],
            unsubmitted: vec![row(3), row(4), row(5)],
            waves: 1,
            cancelled: true,
            ..Default::default()
        });

        assert_eq!(routed.rows.len(), 4);
        assert_eq!(routed.outcome.failed(), 1);
        assert_eq!(routed.outcome.imported(), 1);
        let unsubmitted: Vec<_> = routed.rows.iter().filter(|r| !r.has_error()).collect();
        assert_eq!(unsubmitted.len(), 3);
        assert!(unsubmitted.iter().all(|r| r.warning_message == NOT_SUBMITTED_WARNING));
    }
}
