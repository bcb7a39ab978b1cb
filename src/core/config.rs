//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::PathBuf;

use crate::core::Project;
use crate::import::{ColumnMapping, LogDefaults, LogStatus};

/// Default number of rows submitted per wave
pub const DEFAULT_WAVE_SIZE: usize = 100;

/// Default parser chunk size (100 KB)
pub const DEFAULT_CHUNK_SIZE: usize = 100 * 1024;

/// AIT configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Author recorded on imported assets and log entries
    pub author: Option<String>,

    /// Rows submitted concurrently per wave
    pub wave_size: Option<usize>,

    /// Parser chunk size in bytes
    pub chunk_size: Option<usize>,

    /// Positional or header-based column mapping
    pub column_mapping: Option<ColumnMapping>,

    /// Status written to the log entry of every imported asset
    pub log_status: Option<LogStatus>,

    /// Log comment for newly created assets
    pub log_comment_created: Option<String>,

    /// Log comment for updated assets
    pub log_comment_updated: Option<String>,
}

impl Config {
    /// Load configuration for a specific project (or none), merging every
    /// source in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl / accessors)

        // 2. Global user config (~/.config/ait/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_layer(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.ait/config.yaml)
        if let Some(project) = project {
            let path = project.ait_dir().join("config.yaml");
            if let Some(project_config) = Self::read_layer(&path) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(author) = std::env::var("AIT_AUTHOR") {
            config.author = Some(author);
        }
        if let Some(wave_size) = std::env::var("AIT_WAVE_SIZE")
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            config.wave_size = Some(wave_size);
        }

        config
    }

    fn read_layer(path: &std::path::Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        // A freshly initialized config is all comments
        if contents
            .lines()
            .all(|l| l.trim().is_empty() || l.trim_start().starts_with('#'))
        {
            return None;
        }
        match serde_yml::from_str::<Config>(&contents) {
            Ok(layer) => Some(layer),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "ignoring malformed config layer"
                );
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ait")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.wave_size.is_some() {
            self.wave_size = other.wave_size;
        }
        if other.chunk_size.is_some() {
            self.chunk_size = other.chunk_size;
        }
        if other.column_mapping.is_some() {
            self.column_mapping = other.column_mapping;
        }
        if other.log_status.is_some() {
            self.log_status = other.log_status;
        }
        if other.log_comment_created.is_some() {
            self.log_comment_created = other.log_comment_created;
        }
        if other.log_comment_updated.is_some() {
            self.log_comment_updated = other.log_comment_updated;
        }
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Wave size, never below one
    pub fn wave_size(&self) -> usize {
        self.wave_size.unwrap_or(DEFAULT_WAVE_SIZE).max(1)
    }

    /// Parser chunk size in bytes, never below one
    pub fn chunk_size(&self) -> usize {
        self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1)
    }

    pub fn column_mapping(&self) -> ColumnMapping {
        self.column_mapping.unwrap_or_default()
    }

    /// Fixed values for the log entry written after each primary write
    pub fn log_defaults(&self) -> LogDefaults {
        let defaults = LogDefaults::default();
        LogDefaults {
            status: self.log_status.unwrap_or(defaults.status),
            comment_created: self
                .log_comment_created
                .clone()
                .unwrap_or(defaults.comment_created),
            comment_updated: self
                .log_comment_updated
                .clone()
                .unwrap_or(defaults.comment_updated),
        }
    }
}
