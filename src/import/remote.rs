//! Boundary to the systems an import talks to
//!
//! The engine never knows how records are stored. Everything it needs from
//! the outside world goes through these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use super::catalogue::CatalogueRow;
use super::row::ImportRow;

/// Message used when a failure carries no usable description
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Failure returned by a remote call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Typed rejection with a description, e.g. `AssetNumberAlreadyExists`
    #[error("{code}: {message}")]
    Structured { code: String, message: String },

    /// Transport failure or anything else without a usable description
    #[error("{0}")]
    Unstructured(String),
}

impl RemoteError {
    pub fn structured(code: impl Into<String>, message: impl Into<String>) -> Self {
        RemoteError::Structured {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Text attached to the failed row
    pub fn row_message(&self) -> String {
        match self {
            RemoteError::Structured { message, .. } if !message.trim().is_empty() => {
                message.clone()
            }
            _ => UNKNOWN_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Fields sent with a create or update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInput {
    pub id: String,
    pub asset_number: String,
    pub catalogue_item_code: Option<String>,
    pub serial_number: Option<String>,
    pub installation_date: Option<String>,
    pub notes: String,
    pub store_code: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl From<&ImportRow> for AssetInput {
    fn from(row: &ImportRow) -> Self {
        Self {
            id: row.id.clone(),
            asset_number: row.asset_number.clone(),
            catalogue_item_code: row.catalogue_item_code.clone(),
            serial_number: row.serial_number.clone(),
            installation_date: row.installation_date.clone(),
            notes: row.notes.clone(),
            store_code: row.store_code.clone(),
            properties: row.properties.clone(),
        }
    }
}

/// Fields sent when inserting a catalogue item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueItemInput {
    pub id: String,
    pub sub_catalogue: String,
    pub code: String,
    pub asset_type: String,
    pub manufacturer: Option<String>,
    pub model: String,
    pub class: String,
    pub category: String,
    pub properties: BTreeMap<String, String>,
}

impl From<&CatalogueRow> for CatalogueItemInput {
    fn from(row: &CatalogueRow) -> Self {
        Self {
            id: row.id.clone(),
            sub_catalogue: row.sub_catalogue.clone(),
            code: row.code.clone(),
            asset_type: row.asset_type.clone(),
            manufacturer: row.manufacturer.clone(),
            model: row.model.clone(),
            class: row.class.clone(),
            category: row.category.clone(),
            properties: row.properties.clone(),
        }
    }
}

/// Operational status recorded on an asset log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    NotInUse,
    #[default]
    Functioning,
    FunctioningButNeedsAttention,
    NotFunctioning,
    Decommissioned,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogStatus::NotInUse => "not_in_use",
            LogStatus::Functioning => "functioning",
            LogStatus::FunctioningButNeedsAttention => "functioning_but_needs_attention",
            LogStatus::NotFunctioning => "not_functioning",
            LogStatus::Decommissioned => "decommissioned",
        };
        write!(f, "{}", s)
    }
}

/// Dependent log entry written after a successful primary call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLogInput {
    pub id: String,
    pub asset_id: String,
    pub comment: String,
    pub status: LogStatus,
}

/// Fixed values used for the dependent log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDefaults {
    pub status: LogStatus,
    pub comment_created: String,
    pub comment_updated: String,
}

impl Default for LogDefaults {
    fn default() -> Self {
        Self {
            status: LogStatus::Functioning,
            comment_created: "Created".to_string(),
            comment_updated: "Updated".to_string(),
        }
    }
}

/// Remote create/update and dependent-write calls
#[async_trait]
pub trait AssetService: Send + Sync {
    /// Create a new asset, returning its identifier
    async fn create_asset(&self, input: &AssetInput) -> Result<String, RemoteError>;

    /// Update an existing asset, returning its identifier
    async fn update_asset(&self, input: &AssetInput) -> Result<String, RemoteError>;

    /// Write a log entry tied to an asset
    async fn insert_log(&self, input: &AssetLogInput) -> Result<(), RemoteError>;
}

/// Remote insert for catalogue items
#[async_trait]
pub trait CatalogueService: Send + Sync {
    /// Insert a new catalogue item, returning its identifier
    async fn insert_catalogue_item(&self, input: &CatalogueItemInput)
        -> Result<String, RemoteError>;
}

/// Source of the valid foreign-key codes and names
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn catalogue_codes(&self) -> Result<Vec<String>, RemoteError>;

    async fn store_codes(&self) -> Result<Vec<String>, RemoteError>;

    async fn asset_classes(&self) -> Result<Vec<String>, RemoteError>;

    async fn asset_categories(&self) -> Result<Vec<String>, RemoteError>;

    async fn asset_types(&self) -> Result<Vec<String>, RemoteError>;
}

/// Signal that cached read views of assets are stale
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self);
}

/// Invalidator for callers without cached views
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn invalidate(&self) {}
}
