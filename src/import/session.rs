//! Import buffer and its lifecycle
//!
//! ```text
//!   Upload --Loaded--> Review --StartImport--> Importing
//!     ^                  ^  |                      |
//!     |                  |  +------Restart---------+--> Upload
//!     |                  +---Drained (failures)----+
//!     +----------------------Drained (all ok)------+
//! ```
//!
//! [`ImportSession::apply`] is the only place the phase changes.

use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

use super::router::{route, RouteOutcome};
use super::row::{ImportRow, StagedRow};
use super::submitter::DrainReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Upload,
    Review,
    Importing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Upload => "uploading",
            Phase::Review => "reviewing",
            Phase::Importing => "importing",
        };
        write!(f, "{}", s)
    }
}

/// Inputs to the session state machine
#[derive(Debug)]
pub enum SessionEvent<R = ImportRow> {
    /// Parser and normalizer produced these rows
    Loaded(Vec<R>),
    /// Operator asked to import the buffer
    StartImport,
    /// The submitter finished draining
    Drained(DrainReport<R>),
    /// Operator cancelled or restarted the upload
    Restart,
}

impl<R> SessionEvent<R> {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::Loaded(_) => "load rows",
            SessionEvent::StartImport => "start an import",
            SessionEvent::Drained(_) => "complete an import",
            SessionEvent::Restart => "restart",
        }
    }
}

/// What a successful [`ImportSession::apply`] produced
#[derive(Debug)]
pub enum Transition<R = ImportRow> {
    Reviewing,
    Submitting(SubmissionBatch<R>),
    Routed(RouteOutcome),
    Reset,
}

#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum SessionError {
    #[error("no rows were read from the upload")]
    #[diagnostic(code(ait::session::empty_upload))]
    EmptyUpload,

    #[error("there are no rows to import")]
    #[diagnostic(code(ait::session::nothing_to_import))]
    NothingToImport,

    #[error("{count} row(s) have validation errors")]
    #[diagnostic(
        code(ait::session::validation_errors),
        help("correct or remove the rows with errors before importing")
    )]
    ValidationErrors { count: usize },

    #[error("cannot {event} while {phase}")]
    #[diagnostic(code(ait::session::invalid_transition))]
    InvalidTransition { phase: Phase, event: &'static str },
}

/// Rows cleared for submission.
///
/// Only [`ImportSession`] can build one, and only when no row carries a
/// validation error.
#[derive(Debug)]
pub struct SubmissionBatch<R = ImportRow> {
    rows: Vec<R>,
}

impl<R> SubmissionBatch<R> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub(crate) fn into_rows(self) -> Vec<R> {
        self.rows
    }
}

#[derive(Debug)]
pub struct ImportSession<R = ImportRow> {
    rows: Vec<R>,
    phase: Phase,
    imported_count: usize,
    failed_count: usize,
    in_flight: usize,
    message: Option<String>,
}

impl<R: StagedRow> Default for ImportSession<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            phase: Phase::Upload,
            imported_count: 0,
            failed_count: 0,
            in_flight: 0,
            message: None,
        }
    }
}

fn blocked_message(invalid: usize) -> Option<String> {
    (invalid > 0).then(|| {
        format!(
            "{} row(s) have errors and must be corrected before importing",
            invalid
        )
    })
}

impl<R: StagedRow> ImportSession<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn imported_count(&self) -> usize {
        self.imported_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    /// Rows handed to the submitter and not yet routed
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Session-level notice, e.g. after a partial failure
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Rows currently blocking an import
    pub fn invalid_rows(&self) -> impl Iterator<Item = &R> {
        self.rows.iter().filter(|r| r.has_error())
    }

    /// Source line number and message of every row with an error
    pub fn validation_summary(&self) -> Vec<(usize, &str)> {
        self.invalid_rows()
            .map(|r| (r.line_number(), r.error_message()))
            .collect()
    }

    /// Whether the Review → Importing guard currently holds
    pub fn can_import(&self) -> bool {
        self.phase == Phase::Review
            && !self.rows.is_empty()
            && self.invalid_rows().next().is_none()
    }

    /// Drive the state machine
    pub fn apply(&mut self, event: SessionEvent<R>) -> Result<Transition<R>, SessionError> {
        let name = event.name();
        match (self.phase, event) {
            (Phase::Upload, SessionEvent::Loaded(rows)) => {
                if rows.is_empty() {
                    return Err(SessionError::EmptyUpload);
                }
                self.message = blocked_message(rows.iter().filter(|r| r.has_error()).count());
                self.rows = rows;
                self.imported_count = 0;
                self.failed_count = 0;
                self.phase = Phase::Review;
                Ok(Transition::Reviewing)
            }

            (Phase::Review, SessionEvent::StartImport) => {
                if self.rows.is_empty() {
                    return Err(SessionError::NothingToImport);
                }
                let count = self.invalid_rows().count();
                if count > 0 {
                    return Err(SessionError::ValidationErrors { count });
                }
                let rows = std::mem::take(&mut self.rows);
                self.in_flight = rows.len();
                self.imported_count = 0;
                self.failed_count = 0;
                self.message = None;
                self.phase = Phase::Importing;
                Ok(Transition::Submitting(SubmissionBatch { rows }))
            }

            (Phase::Importing, SessionEvent::Drained(report)) => {
                let routed = route(report);
                self.in_flight = 0;
                self.imported_count = routed.outcome.imported();
                self.failed_count = routed.outcome.failed();
                self.message = routed.message;
                self.rows = routed.rows;
                self.phase = if self.rows.is_empty() {
                    Phase::Upload
                } else {
                    Phase::Review
                };
                Ok(Transition::Routed(routed.outcome))
            }

            (Phase::Upload | Phase::Review, SessionEvent::Restart) => {
                self.rows.clear();
                self.message = None;
                self.imported_count = 0;
                self.failed_count = 0;
                self.phase = Phase::Upload;
                Ok(Transition::Reset)
            }

            (phase, _) => Err(SessionError::InvalidTransition { phase, event: name }),
        }
    }

    pub fn load(&mut self, rows: Vec<R>) -> Result<(), SessionError> {
        self.apply(SessionEvent::Loaded(rows)).map(|_| ())
    }

    pub fn begin_import(&mut self) -> Result<SubmissionBatch<R>, SessionError> {
        match self.apply(SessionEvent::StartImport)? {
            Transition::Submitting(batch) => Ok(batch),
            _ => Err(SessionError::InvalidTransition {
                phase: self.phase,
                event: "start an import",
            }),
        }
    }

    pub fn complete(&mut self, report: DrainReport<R>) -> Result<RouteOutcome, SessionError> {
        match self.apply(SessionEvent::Drained(report))? {
            Transition::Routed(outcome) => Ok(outcome),
            _ => Err(SessionError::InvalidTransition {
                phase: self.phase,
                event: "complete an import",
            }),
        }
    }

    pub fn restart(&mut self) -> Result<(), SessionError> {
        self.apply(SessionEvent::Restart).map(|_| ())
    }

    fn require_review(&self, event: &'static str) -> Result<(), SessionError> {
        if self.phase == Phase::Review {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                phase: self.phase,
                event,
            })
        }
    }

    /// Drop a row from the buffer during review
    pub fn remove_row(&mut self, id: &str) -> Result<Option<R>, SessionError> {
        self.require_review("remove a row")?;
        let removed = self
            .rows
            .iter()
            .position(|r| r.id() == id)
            .map(|idx| self.rows.remove(idx));
        Ok(removed)
    }

    /// Replace a row (matched by id) with a corrected version
    pub fn replace_row(&mut self, row: R) -> Result<bool, SessionError> {
        self.require_review("edit a row")?;
        match self.rows.iter_mut().find(|r| r.id() == row.id()) {
            Some(slot) => {
                *slot = row;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-check every buffered row, e.g. before retrying rows that failed
    /// submission. Returns how many rows still carry an error.
    pub fn revalidate<F>(&mut self, check: F) -> Result<usize, SessionError>
    where
        F: FnMut(R) -> R,
    {
        self.require_review("revalidate rows")?;
        self.rows = std::mem::take(&mut self.rows).into_iter().map(check).collect();
        let invalid = self.invalid_rows().count();
        self.message = blocked_message(invalid);
        Ok(invalid)
    }

    /// Remove and return every row carrying a validation error.
    ///
    /// Each returned row keeps its source line number.
    pub fn take_invalid(&mut self) -> Result<Vec<R>, SessionError> {
        self.require_review("remove invalid rows")?;
        let (invalid, valid): (Vec<_>, Vec<_>) = std::mem::take(&mut self.rows)
            .into_iter()
            .partition(|r| r.has_error());
        self.rows = valid;
        if self.invalid_rows().next().is_none() {
            self.message = None;
        }
        Ok(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn valid_row(n: usize) -> ImportRow {
        ImportRow {
            id: format!("AST-{n}"),
            line_number: n + 1,
            asset_number: format!("A-{n}"),
            catalogue_item_code: Some("FR-100".into()),
            ..Default::default()
        }
    }

    fn empty_report() -> DrainReport {
        DrainReport::default()
    }

    fn new_session() -> ImportSession {
        ImportSession::new()
    }

    #[test]
    fn test_new_session_is_upload() {
        let session = new_session();
        assert_eq!(session.phase(), Phase::Upload);
        assert!(session.rows().is_empty());
    }

    #[test]
    fn test_empty_upload_stays_in_upload() {
        let mut session = new_session();
        assert_eq!(session.load(vec![]), Err(SessionError::EmptyUpload));
        assert_eq!(session.phase(), Phase::Upload);
    }

    #[test]
    fn test_no_direct_upload_to_importing() {
        let mut session = new_session();
        let err = session.begin_import().unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                phase: Phase::Upload,
                ..
            }
        ));
    }

    #[test]
    fn test_validation_errors_block_import() {
        let mut session = new_session();
        let mut rows: Vec<ImportRow> = (1..=5).map(valid_row).collect();
        rows[2].asset_number.clear();
        rows[2].error_message = "Asset number must be specified".into();
        session.load(rows).unwrap();

        assert_eq!(session.phase(), Phase::Review);
        assert!(!session.can_import());
        assert!(session.message().is_some());
        assert_eq!(
            session.begin_import().unwrap_err(),
            SessionError::ValidationErrors { count: 1 }
        );
        assert_eq!(session.phase(), Phase::Review);
        assert_eq!(session.rows().len(), 5);
        assert_eq!(
            session.validation_summary(),
            vec![(4, "Asset number must be specified")]
        );
    }

    #[test]
    fn test_correcting_the_row_unblocks_import() {
        let mut session = new_session();
        let mut rows: Vec<ImportRow> = (1..=5).map(valid_row).collect();
        rows[2].error_message = "Asset number must be specified".into();
        session.load(rows).unwrap();

        assert!(session.replace_row(valid_row(3)).unwrap());
        assert!(session.can_import());

        let batch = session.begin_import().unwrap();
        assert_eq!(batch.len(), 5);
        assert_eq!(session.phase(), Phase::Importing);
        assert_eq!(session.in_flight(), 5);
        assert!(session.rows().is_empty());
    }

    #[test]
    fn test_removing_invalid_rows_unblocks_import() {
        let mut session = new_session();
        let mut rows: Vec<ImportRow> = (1..=4).map(valid_row).collect();
        rows[0].error_message = "bad".into();
        rows[3].error_message = "bad".into();
        session.load(rows).unwrap();

        let removed = session.take_invalid().unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(session.rows().len(), 2);
        assert!(session.can_import());
        assert!(session.message().is_none());
    }

    #[test]
    fn test_remove_row_by_id() {
        let mut session = new_session();
        session.load((1..=3).map(valid_row).collect()).unwrap();

        let removed = session.remove_row("AST-2").unwrap();
        assert_eq!(removed.map(|r| r.asset_number), Some("A-2".to_string()));
        assert!(session.remove_row("AST-2").unwrap().is_none());
        assert_eq!(session.rows().len(), 2);
    }

    #[test]
    fn test_removing_every_row_leaves_nothing_to_import() {
        let mut session = new_session();
        session.load(vec![valid_row(1)]).unwrap();
        session.remove_row("AST-1").unwrap();
        assert_eq!(session.begin_import().unwrap_err(), SessionError::NothingToImport);
    }

    #[test]
    fn test_restart_clears_review() {
        let mut session = new_session();
        session.load(vec![valid_row(1)]).unwrap();
        session.restart().unwrap();
        assert_eq!(session.phase(), Phase::Upload);
        assert!(session.rows().is_empty());
    }

    #[test]
    fn test_cannot_restart_or_edit_while_importing() {
        let mut session = new_session();
        session.load(vec![valid_row(1)]).unwrap();
        session.begin_import().unwrap();

        assert!(session.restart().is_err());
        assert!(session.remove_row("AST-1").is_err());
        assert!(session.load(vec![valid_row(2)]).is_err());
        assert_eq!(session.phase(), Phase::Importing);
    }

    #[test]
    fn test_clean_drain_returns_to_upload() {
        let mut session = new_session();
        session.load(vec![valid_row(1), valid_row(2)]).unwrap();
        session.begin_import().unwrap();

        let report = DrainReport {
            total: 2,
            created: 2,
            waves: 1,
            ..empty_report()
        };
        let outcome = session.complete(report).unwrap();

        assert_eq!(outcome, RouteOutcome::Imported { count: 2 });
        assert_eq!(session.phase(), Phase::Upload);
        assert!(session.rows().is_empty());
        assert_eq!(session.imported_count(), 2);
        assert_eq!(session.failed_count(), 0);
    }

    #[test]
    fn test_failed_drain_returns_to_review_with_failures() {
        let mut session = new_session();
        session.load((1..=3).map(valid_row).collect()).unwrap();
        session.begin_import().unwrap();

        let report = DrainReport {
            total: 3,
            created: 2,
            failed: vec![valid_row(2).with_error("AssetNumberAlreadyExists")],
            waves: 1,
            ..empty_report()
        };
        session.complete(report).unwrap();

        assert_eq!(session.phase(), Phase::Review);
        assert_eq!(session.failed_count(), 1);
        assert_eq!(session.rows().len(), 1);
        assert_eq!(session.rows()[0].error_message, "AssetNumberAlreadyExists");
        assert!(session.message().is_some());
        // Failed rows carry errors, so they must be fixed before the next attempt
        assert!(!session.can_import());
    }

    #[test]
    fn test_revalidate_allows_retry_of_failed_rows() {
        let mut session = new_session();
        session.load((1..=2).map(valid_row).collect()).unwrap();
        session.begin_import().unwrap();
        session
            .complete(DrainReport {
                total: 2,
                created: 1,
                failed: vec![valid_row(2).with_error("timeout")],
                waves: 1,
                ..empty_report()
            })
            .unwrap();

        let remaining = session
            .revalidate(|mut row| {
                row.error_message.clear();
                row
            })
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(session.can_import());
        assert_eq!(session.begin_import().unwrap().len(), 1);
    }

    #[test]
    fn test_drained_outside_importing_is_rejected() {
        let mut session = new_session();
        let err = session.complete(empty_report()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                phase: Phase::Upload,
                ..
            }
        ));
    }
}
