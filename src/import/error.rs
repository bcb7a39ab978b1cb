//! Session-level import errors
//!
//! These abort the whole upload. Row-level problems never appear here; they
//! are carried as data on [`ImportRow`](super::ImportRow).

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ImportError {
    #[error("unsupported file type: {path:?}")]
    #[diagnostic(
        code(ait::import::invalid_file),
        help("only comma-separated files with a .csv extension can be imported")
    )]
    UnsupportedFileType { path: PathBuf },

    #[error("file not found: {0:?}")]
    #[diagnostic(code(ait::import::not_found))]
    FileNotFound(PathBuf),

    #[error("could not read {path:?}: {message}")]
    #[diagnostic(code(ait::import::unreadable))]
    Unreadable { path: PathBuf, message: String },

    #[error("{path:?} is empty")]
    #[diagnostic(
        code(ait::import::empty_file),
        help("the first line must be a header, followed by one row per record")
    )]
    EmptyFile { path: PathBuf },

    #[error("{path:?} contains a header but no data rows")]
    #[diagnostic(code(ait::import::no_rows))]
    NoRows { path: PathBuf },

    #[error("required column '{header}' is missing from the header row")]
    #[diagnostic(
        code(ait::import::missing_header),
        help(
            "header-based mapping is enabled; generate a template with `ait template` \
             to see the expected headers"
        )
    )]
    MissingHeader { header: String },

    #[error("could not load reference data: {0}")]
    #[diagnostic(code(ait::import::reference_data))]
    ReferenceData(String),
}

impl ImportError {
    pub(crate) fn unreadable(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        ImportError::Unreadable {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}
