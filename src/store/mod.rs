//! File-backed storage for imported records
//!
//! [`LocalRegistry`] implements the import engine's remote traits on top of
//! the project directory, one YAML file per record. [`CatalogueStore`] does the
//! same for catalogue items, which live in a single document.

pub mod catalogue;
pub mod reference;
pub mod registry;

pub use catalogue::{Catalogue, CatalogueItem, CatalogueStore, PropertySet};
pub use reference::{ReferenceSets, StoreEntry};
pub use registry::{AssetRecord, LocalRegistry, LogRecord};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::import::remote::RemoteError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} already exists")]
    RecordAlreadyExists(String),

    #[error("no record with id {0}")]
    RecordNotFound(String),

    #[error("asset number {0} is already used by another asset")]
    AssetNumberAlreadyExists(String),

    #[error("{0} is not a valid record id")]
    InvalidId(String),

    #[error("catalogue item code {0} already exists")]
    DuplicateCatalogueCode(String),

    #[error("a catalogue item for {manufacturer} {model} already exists")]
    DuplicateManufacturerModel { manufacturer: String, model: String },

    #[error("store code {0} already exists")]
    DuplicateStoreCode(String),

    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to serialize {path:?}: {message}")]
    Serialize { path: PathBuf, message: String },

    #[error("i/o error on {path:?}: {message}")]
    Io { path: PathBuf, message: String },
}

impl StoreError {
    pub(crate) fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn parse(path: &Path, err: impl std::fmt::Display) -> Self {
        StoreError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn serialize(path: &Path, err: impl std::fmt::Display) -> Self {
        StoreError::Serialize {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Machine-readable name of a rejection
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::RecordAlreadyExists(_) => "RecordAlreadyExists",
            StoreError::RecordNotFound(_) => "RecordNotFound",
            StoreError::AssetNumberAlreadyExists(_) => "AssetNumberAlreadyExists",
            StoreError::InvalidId(_) => "InvalidId",
            StoreError::DuplicateCatalogueCode(_) => "DuplicateCatalogueCode",
            StoreError::DuplicateManufacturerModel { .. } => "ManufacturerModelAlreadyExists",
            StoreError::DuplicateStoreCode(_) => "DuplicateStoreCode",
            StoreError::Parse { .. } => "Parse",
            StoreError::Serialize { .. } => "Serialize",
            StoreError::Io { .. } => "Io",
        }
    }
}

// Rejections become structured errors whose message is the rejection name,
// which is what ends up on the failed row. Storage faults carry no usable
// description for the operator.
impl From<StoreError> for RemoteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RecordAlreadyExists(_)
            | StoreError::RecordNotFound(_)
            | StoreError::AssetNumberAlreadyExists(_)
            | StoreError::InvalidId(_)
            | StoreError::DuplicateCatalogueCode(_)
            | StoreError::DuplicateManufacturerModel { .. }
            | StoreError::DuplicateStoreCode(_) => RemoteError::structured(err.code(), err.code()),
            other => RemoteError::Unstructured(other.to_string()),
        }
    }
}

/// Read a project document; a missing file is the default value
pub(crate) fn read_yaml<T>(path: &Path) -> Result<T, StoreError>
where
    T: Default + for<'de> Deserialize<'de> + 'static,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_yml::from_str(&content).map_err(|e| StoreError::parse(path, e))
}

pub(crate) fn save_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let yaml = serde_yml::to_string(value).map_err(|e| StoreError::serialize(path, e))?;
    fs::write(path, yaml).map_err(|e| StoreError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_are_structured() {
        let remote: RemoteError = StoreError::AssetNumberAlreadyExists("A-1".into()).into();
        assert_eq!(remote.row_message(), "AssetNumberAlreadyExists");

        let remote: RemoteError = StoreError::DuplicateManufacturerModel {
            manufacturer: "Acme".into(),
            model: "R-200".into(),
        }
        .into();
        assert_eq!(remote.row_message(), "ManufacturerModelAlreadyExists");
    }

    #[test]
    fn test_io_faults_are_unstructured() {
        let remote: RemoteError = StoreError::io(Path::new("assets/x"), "disk full").into();
        assert!(matches!(remote, RemoteError::Unstructured(_)));
        assert_eq!(remote.row_message(), crate::import::remote::UNKNOWN_ERROR_MESSAGE);
    }
}
