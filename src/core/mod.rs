//! Core module - fundamental types and utilities

pub mod config;
pub mod identity;
pub mod project;

pub use config::Config;
pub use identity::{IdParseError, RecordId, RecordKind};
pub use project::{Project, ProjectError};
