//! Stores and asset classification names

use serde::{Deserialize, Serialize};

use super::{read_yaml, save_yaml, StoreError};
use crate::core::project::Project;

/// A store assets can be placed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    /// Unique code used in the `storeCode` column
    pub code: String,

    pub name: String,
}

/// Contents of `.ait/reference.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSets {
    #[serde(default)]
    pub stores: Vec<StoreEntry>,

    #[serde(default)]
    pub asset_classes: Vec<String>,

    #[serde(default)]
    pub asset_categories: Vec<String>,

    #[serde(default)]
    pub asset_types: Vec<String>,
}

impl ReferenceSets {
    /// Load the project's reference sets; a missing file means no entries
    pub fn load(project: &Project) -> Result<Self, StoreError> {
        read_yaml(&project.reference_path())
    }

    pub fn save(&self, project: &Project) -> Result<(), StoreError> {
        save_yaml(&project.reference_path(), self)
    }

    /// Add a store, rejecting duplicate codes
    pub fn add_store(&mut self, entry: StoreEntry) -> Result<(), StoreError> {
        if self.stores.iter().any(|store| store.code == entry.code) {
            return Err(StoreError::DuplicateStoreCode(entry.code));
        }
        self.stores.push(entry);
        Ok(())
    }

    pub fn store_codes(&self) -> Vec<String> {
        self.stores.iter().map(|store| store.code.clone()).collect()
    }
}
