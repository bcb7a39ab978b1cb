//! Catalogue and property definition files

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::{read_yaml, save_yaml, StoreError};
use crate::core::project::Project;
use crate::import::remote::{CatalogueItemInput, CatalogueService, RemoteError};
use crate::import::row::PropertyDefinition;

/// A catalogue item assets may reference by code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueItem {
    /// Unique code used in the `catalogueItemCode` column
    pub code: String,

    /// Display name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Set on items created by a catalogue import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_catalogue: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl From<&CatalogueItemInput> for CatalogueItem {
    fn from(input: &CatalogueItemInput) -> Self {
        let name = match &input.manufacturer {
            Some(manufacturer) => format!("{} {}", manufacturer, input.model),
            None => input.model.clone(),
        };
        Self {
            code: input.code.clone(),
            name,
            description: None,
            id: Some(input.id.clone()),
            sub_catalogue: Some(input.sub_catalogue.clone()),
            manufacturer: input.manufacturer.clone(),
            model: Some(input.model.clone()),
            class: Some(input.class.clone()),
            category: Some(input.category.clone()),
            asset_type: Some(input.asset_type.clone()),
            properties: input.properties.clone(),
        }
    }
}

/// Contents of `.ait/catalogue.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalogue {
    #[serde(default)]
    pub items: Vec<CatalogueItem>,
}

impl Catalogue {
    /// Load the project's catalogue; a missing file is an empty catalogue
    pub fn load(project: &Project) -> Result<Self, StoreError> {
        read_yaml(&project.catalogue_path())
    }

    pub fn save(&self, project: &Project) -> Result<(), StoreError> {
        save_yaml(&project.catalogue_path(), self)
    }

    pub fn find(&self, code: &str) -> Option<&CatalogueItem> {
        self.items.iter().find(|item| item.code == code)
    }

    /// Add an item, rejecting duplicate codes and, for items with a model,
    /// a manufacturer and model pair that is already catalogued
    pub fn add(&mut self, item: CatalogueItem) -> Result<(), StoreError> {
        if self.find(&item.code).is_some() {
            return Err(StoreError::DuplicateCatalogueCode(item.code));
        }
        if let Some(model) = &item.model {
            let taken = self.items.iter().any(|existing| {
                existing.model.as_ref() == Some(model) && existing.manufacturer == item.manufacturer
            });
            if taken {
                return Err(StoreError::DuplicateManufacturerModel {
                    manufacturer: item.manufacturer.clone().unwrap_or_default(),
                    model: model.clone(),
                });
            }
        }
        self.items.push(item);
        Ok(())
    }

    pub fn codes(&self) -> Vec<String> {
        self.items.iter().map(|item| item.code.clone()).collect()
    }
}

/// Catalogue inserts for the import engine.
///
/// The catalogue is one document, so each insert reads, checks and rewrites it
/// while holding the lock.
#[derive(Debug)]
pub struct CatalogueStore {
    project: Project,
    lock: Mutex<()>,
}

impl CatalogueStore {
    pub fn new(project: &Project) -> Self {
        Self {
            project: project.clone(),
            lock: Mutex::new(()),
        }
    }

    async fn insert(&self, input: &CatalogueItemInput) -> Result<String, StoreError> {
        let path = self.project.catalogue_path();
        let _guard = self.lock.lock().await;

        let mut catalogue: Catalogue = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_yml::from_str(&content).map_err(|e| StoreError::parse(&path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Catalogue::default(),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        catalogue.add(CatalogueItem::from(input))?;

        let yaml = serde_yml::to_string(&catalogue).map_err(|e| StoreError::serialize(&path, e))?;
        tokio::fs::write(&path, yaml)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        tracing::debug!(code = %input.code, "inserted catalogue item");
        Ok(input.id.clone())
    }
}

#[async_trait]
impl CatalogueService for CatalogueStore {
    async fn insert_catalogue_item(
        &self,
        input: &CatalogueItemInput,
    ) -> Result<String, RemoteError> {
        self.insert(input).await.map_err(RemoteError::from)
    }
}

/// Contents of `.ait/properties.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertySet {
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

impl PropertySet {
    pub fn load(project: &Project) -> Result<Self, StoreError> {
        read_yaml(&project.properties_path())
    }
}
