//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::RecordKind;

/// Represents an AIT project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .ait/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(".ait").is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(".ait").exists() {
            return Err(ProjectError::AlreadyExists(root.clone()));
        }

        Self::write_structure(root)
    }

    /// Force initialization even if .ait/ exists
    ///
    /// Existing catalogue, property and reference files are kept; only the
    /// config is rewritten.
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::write_structure(root)
    }

    fn write_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let ait_dir = root.join(".ait");
        std::fs::create_dir_all(&ait_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(ait_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        for (file, contents) in [
            ("catalogue.yaml", Self::default_catalogue()),
            ("properties.yaml", Self::default_properties()),
            ("reference.yaml", Self::default_reference()),
        ] {
            let path = ait_dir.join(file);
            if !path.exists() {
                std::fs::write(&path, contents)
                    .map_err(|e| ProjectError::IoError(e.to_string()))?;
            }
        }

        for kind in RecordKind::all() {
            std::fs::create_dir_all(root.join(kind.directory()))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# AIT Project Configuration

# Default author recorded on imported assets and log entries
# author: ""

# Number of remote calls issued concurrently per import wave
# wave_size: 100

# Parser chunk size in bytes
# chunk_size: 102400

# How CSV columns are mapped onto fields (positional, header)
# column_mapping: positional

# Defaults written to the log entry created for every imported asset
# log_status: functioning
# log_comment_created: Created
# log_comment_updated: Updated
"#
    }

    fn default_catalogue() -> &'static str {
        "# Catalogue items that imported assets may reference by code\nitems: []\n"
    }

    fn default_properties() -> &'static str {
        "# Dynamic asset properties read from CSV columns with a matching header\n\
         properties: []\n"
    }

    fn default_reference() -> &'static str {
        r#"# Stores assets may be placed in (storeCode column)
stores: []

# Names catalogue imports are checked against
asset_classes:
  - Cold chain equipment
asset_categories:
  - Refrigerators and freezers
  - Insulated containers
asset_types:
  - Refrigerator
  - Freezer
  - Cold box
  - Vaccine carrier
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .ait configuration directory
    pub fn ait_dir(&self) -> PathBuf {
        self.root.join(".ait")
    }

    /// Path of the catalogue reference file
    pub fn catalogue_path(&self) -> PathBuf {
        self.ait_dir().join("catalogue.yaml")
    }

    /// Path of the stores and classification names file
    pub fn reference_path(&self) -> PathBuf {
        self.ait_dir().join("reference.yaml")
    }

    /// Path of the dynamic property definitions file
    pub fn properties_path(&self) -> PathBuf {
        self.ait_dir().join("properties.yaml")
    }

    /// Get the directory for a given record kind
    pub fn record_dir(&self, kind: RecordKind) -> PathBuf {
        self.root.join(kind.directory())
    }

    /// Get the path of a record file
    pub fn record_path(&self, kind: RecordKind, id: &str) -> PathBuf {
        self.record_dir(kind).join(format!("{}.ait.yaml", id))
    }

    /// Iterate all record files of a given kind
    pub fn iter_record_files(&self, kind: RecordKind) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(self.record_dir(kind))
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(".ait.yaml"))
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not an AIT project (searched from {searched_from:?}). Run 'ait init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("AIT project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
