//! Catalogue item rows
//!
//! Catalogue items go through the same parser, session, submitter, router and
//! export as assets. Only the columns, the checks and the write differ.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use ulid::Ulid;

use super::export::CsvRecord;
use super::normalizer::{
    non_empty, property_problem, stored_property, Column, ColumnLayout, ColumnMapping,
    RowNormalizer,
};
use super::remote::{CatalogueItemInput, CatalogueService, RemoteError};
use super::row::{PropertyDefinition, RawRow, StagedRow, ERROR_SEPARATOR};
use super::submitter::RowWriter;

/// Rows submitted concurrently per wave for catalogue imports
pub const CATALOGUE_WAVE_SIZE: usize = 10;

/// Columns of a catalogue import file, in column order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogueColumn {
    SubCatalogue,
    Code,
    Type,
    Manufacturer,
    Model,
    Class,
    Category,
}

impl Column for CatalogueColumn {
    const ALL: &'static [CatalogueColumn] = &[
        CatalogueColumn::SubCatalogue,
        CatalogueColumn::Code,
        CatalogueColumn::Type,
        CatalogueColumn::Manufacturer,
        CatalogueColumn::Model,
        CatalogueColumn::Class,
        CatalogueColumn::Category,
    ];

    fn header(&self) -> &'static str {
        match self {
            CatalogueColumn::SubCatalogue => "subCatalogue",
            CatalogueColumn::Code => "code",
            CatalogueColumn::Type => "type",
            CatalogueColumn::Manufacturer => "manufacturer",
            CatalogueColumn::Model => "model",
            CatalogueColumn::Class => "class",
            CatalogueColumn::Category => "category",
        }
    }

    fn position(&self) -> usize {
        *self as usize
    }

    fn required_header(&self) -> bool {
        !matches!(self, CatalogueColumn::Manufacturer)
    }
}

/// One candidate catalogue item awaiting import
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogueRow {
    /// Generated for every row; catalogue imports never update
    pub id: String,
    pub line_number: usize,

    pub sub_catalogue: String,
    pub code: String,
    pub asset_type: String,
    pub manufacturer: Option<String>,
    pub model: String,
    pub class: String,
    pub category: String,

    pub properties: BTreeMap<String, String>,

    pub error_message: String,
    pub warning_message: String,
}

impl StagedRow for CatalogueRow {
    fn id(&self) -> &str {
        &self.id
    }

    fn line_number(&self) -> usize {
        self.line_number
    }

    fn error_message(&self) -> &str {
        &self.error_message
    }

    fn set_error_message(&mut self, message: String) {
        self.error_message = message;
    }

    fn warning_message(&self) -> &str {
        &self.warning_message
    }

    fn warning_message_mut(&mut self) -> &mut String {
        &mut self.warning_message
    }
}

impl CsvRecord for CatalogueRow {
    type Column = CatalogueColumn;

    fn core_cells(&self) -> Vec<String> {
        vec![
            self.sub_catalogue.clone(),
            self.code.clone(),
            self.asset_type.clone(),
            self.manufacturer.clone().unwrap_or_default(),
            self.model.clone(),
            self.class.clone(),
            self.category.clone(),
        ]
    }

    fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    fn example() -> Self {
        CatalogueRow {
            sub_catalogue: "General".to_string(),
            code: "A unique code for this item".to_string(),
            asset_type: "Refrigerator".to_string(),
            manufacturer: Some("Some Manufacturer".to_string()),
            model: "Some Model".to_string(),
            class: "Cold chain equipment".to_string(),
            category: "Refrigerators and freezers".to_string(),
            ..Default::default()
        }
    }
}

/// Asset class, category and type names fetched once per upload
#[derive(Debug, Clone, Default)]
pub struct CatalogueReference {
    classes: HashSet<String>,
    categories: HashSet<String>,
    types: HashSet<String>,
}

impl CatalogueReference {
    pub fn new<I, S>(classes: I, categories: I, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
            categories: categories.into_iter().map(Into::into).collect(),
            types: types.into_iter().map(Into::into).collect(),
        }
    }
}

/// Check a required name against a reference set
fn check_named(
    errors: &mut Vec<String>,
    label: &str,
    value: &str,
    known: &HashSet<String>,
    kind: &str,
) {
    if value.is_empty() {
        errors.push(format!("{} must be specified", label));
    } else if !known.contains(value) {
        errors.push(format!("{} '{}' does not match any {}", label, value, kind));
    }
}

pub struct CatalogueNormalizer<'a> {
    reference: &'a CatalogueReference,
    properties: &'a [PropertyDefinition],
    mapping: ColumnMapping,
}

impl<'a> CatalogueNormalizer<'a> {
    pub fn new(reference: &'a CatalogueReference, properties: &'a [PropertyDefinition]) -> Self {
        Self {
            reference,
            properties,
            mapping: ColumnMapping::Positional,
        }
    }

    pub fn with_mapping(mut self, mapping: ColumnMapping) -> Self {
        self.mapping = mapping;
        self
    }

    fn validate(&self, row: &CatalogueRow) -> Vec<String> {
        let mut errors = Vec::new();

        if row.sub_catalogue.is_empty() {
            errors.push("Sub-catalogue must be specified".to_string());
        }
        if row.code.is_empty() {
            errors.push("Catalogue item code must be specified".to_string());
        }
        check_named(&mut errors, "Class", &row.class, &self.reference.classes, "asset class");
        check_named(
            &mut errors,
            "Category",
            &row.category,
            &self.reference.categories,
            "asset category",
        );
        check_named(&mut errors, "Type", &row.asset_type, &self.reference.types, "asset type");
        if row.model.is_empty() {
            errors.push("Model must be specified".to_string());
        }

        // Unlike asset properties, a bad catalogue property blocks the row
        for property in self.properties {
            if let Some(value) = row.properties.get(&property.key) {
                errors.extend(property_problem(property, value));
            }
        }

        errors
    }
}

impl RowNormalizer for CatalogueNormalizer<'_> {
    type Row = CatalogueRow;
    type Column = CatalogueColumn;

    fn mapping(&self) -> ColumnMapping {
        self.mapping
    }

    fn revalidate(&self, mut row: CatalogueRow) -> CatalogueRow {
        row.error_message = self.validate(&row).join(ERROR_SEPARATOR);
        row
    }

    fn normalize(&self, layout: &ColumnLayout, raw: &RawRow) -> CatalogueRow {
        let mut row = CatalogueRow {
            id: Ulid::new().to_string(),
            line_number: raw.line_number,
            ..Default::default()
        };

        if let Some(ref err) = raw.parse_error {
            row.error_message = err.clone();
            return row;
        }

        row.sub_catalogue = layout.cell(raw, CatalogueColumn::SubCatalogue).to_string();
        row.code = layout.cell(raw, CatalogueColumn::Code).to_string();
        row.asset_type = layout.cell(raw, CatalogueColumn::Type).to_string();
        row.manufacturer = non_empty(layout.cell(raw, CatalogueColumn::Manufacturer));
        row.model = layout.cell(raw, CatalogueColumn::Model).to_string();
        row.class = layout.cell(raw, CatalogueColumn::Class).to_string();
        row.category = layout.cell(raw, CatalogueColumn::Category).to_string();

        for property in self.properties {
            let value = raw.by_header(&property.name);
            if !value.is_empty() {
                row.properties
                    .insert(property.key.clone(), stored_property(property, value));
            }
        }

        row.error_message = self.validate(&row).join(ERROR_SEPARATOR);
        row
    }
}

/// Inserts each row as a new catalogue item
pub struct CatalogueWriter {
    service: Arc<dyn CatalogueService>,
}

impl CatalogueWriter {
    pub fn new(service: Arc<dyn CatalogueService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RowWriter<CatalogueRow> for CatalogueWriter {
    async fn write_row(&self, row: &CatalogueRow) -> Result<String, RemoteError> {
        self.service
            .insert_catalogue_item(&CatalogueItemInput::from(row))
            .await
    }
}
