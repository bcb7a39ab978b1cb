//! Row normalization and validation
//!
//! Turns each [`RawRow`] into an [`ImportRow`], assigning identity and
//! accumulating every validation message. Nothing here fails: a row that
//! cannot be read becomes a row with an error so the operator still sees it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;

use crate::core::identity::{RecordId, RecordKind};

use super::error::ImportError;
use super::parser::RowChunks;
use super::row::{
    HeaderIndex, ImportRow, PropertyDefinition, PropertyValueType, RawRow, StagedRow,
    ERROR_SEPARATOR,
};

pub(crate) fn non_empty(value: &str) -> Option<String> {
    Some(value).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Date format accepted for dated fields
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// How uploaded columns are mapped onto fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMapping {
    /// Fixed column order; header names are informational only
    #[default]
    Positional,
    /// Columns located by header name once at parse start
    Header,
}

/// Fixed columns of one kind of import file
pub trait Column: Copy + 'static {
    /// Every column, in positional order
    const ALL: &'static [Self];

    /// Column header written on export and looked up in header mode
    fn header(&self) -> &'static str;

    fn position(&self) -> usize;

    /// Header mode refuses files without this column
    fn required_header(&self) -> bool;
}

/// Core fields of an asset import file, in column order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    AssetNumber,
    CatalogueItemCode,
    SerialNumber,
    InstallationDate,
    Notes,
    StoreCode,
}

impl Column for Field {
    const ALL: &'static [Field] = &[
        Field::Id,
        Field::AssetNumber,
        Field::CatalogueItemCode,
        Field::SerialNumber,
        Field::InstallationDate,
        Field::Notes,
        Field::StoreCode,
    ];

    fn header(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::AssetNumber => "assetNumber",
            Field::CatalogueItemCode => "catalogueItemCode",
            Field::SerialNumber => "serialNumber",
            Field::InstallationDate => "installationDate",
            Field::Notes => "notes",
            Field::StoreCode => "storeCode",
        }
    }

    fn position(&self) -> usize {
        *self as usize
    }

    fn required_header(&self) -> bool {
        matches!(self, Field::AssetNumber | Field::CatalogueItemCode)
    }
}

/// Column positions resolved for one upload
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    positions: Vec<Option<usize>>,
}

impl ColumnLayout {
    pub fn positional<C: Column>() -> Self {
        Self {
            positions: C::ALL.iter().map(|c| Some(c.position())).collect(),
        }
    }

    /// Resolve the layout, failing fast in header mode when a required
    /// column is absent.
    pub fn resolve<C: Column>(
        mapping: ColumnMapping,
        headers: &HeaderIndex,
    ) -> Result<Self, ImportError> {
        match mapping {
            ColumnMapping::Positional => Ok(Self::positional::<C>()),
            ColumnMapping::Header => {
                let mut positions = vec![None; C::ALL.len()];
                for column in C::ALL {
                    let found = headers.position(column.header());
                    if found.is_none() && column.required_header() {
                        return Err(ImportError::MissingHeader {
                            header: column.header().to_string(),
                        });
                    }
                    positions[column.position()] = found;
                }
                Ok(Self { positions })
            }
        }
    }

    pub fn cell<'a, C: Column>(&self, row: &'a RawRow, column: C) -> &'a str {
        self.positions
            .get(column.position())
            .copied()
            .flatten()
            .map(|idx| row.get(idx))
            .unwrap_or("")
    }
}

/// Turns raw rows of one kind of file into staged rows
pub trait RowNormalizer {
    type Row: StagedRow;
    type Column: Column;

    fn mapping(&self) -> ColumnMapping;

    /// Normalize a single row. Never fails; problems become the row's error.
    fn normalize(&self, layout: &ColumnLayout, raw: &RawRow) -> Self::Row;

    /// Re-run validation on an edited row.
    ///
    /// Any previous message, including a submission failure, is replaced by
    /// the outcome of the checks.
    fn revalidate(&self, row: Self::Row) -> Self::Row;

    /// Drain a parser, normalizing every row in file order.
    ///
    /// Stops at the first session-level error. A file that yields no rows is
    /// itself a session-level error.
    fn normalize_chunks<R: Read>(
        &self,
        chunks: RowChunks<R>,
    ) -> Result<Vec<Self::Row>, ImportError> {
        let layout = ColumnLayout::resolve::<Self::Column>(self.mapping(), chunks.headers())?;
        let source = chunks.source().to_path_buf();

        let mut rows = Vec::new();
        for chunk in chunks {
            rows.extend(chunk?.iter().map(|raw| self.normalize(&layout, raw)));
        }

        if rows.is_empty() {
            return Err(ImportError::NoRows { path: source });
        }

        let invalid = rows.iter().filter(|r| r.has_error()).count();
        tracing::info!(rows = rows.len(), invalid, "normalized upload");
        Ok(rows)
    }
}

/// Foreign-key codes fetched once before normalization
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    catalogue_codes: HashSet<String>,
    store_codes: HashSet<String>,
}

impl ReferenceData {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            catalogue_codes: codes.into_iter().map(Into::into).collect(),
            store_codes: HashSet::new(),
        }
    }

    pub fn with_stores<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.store_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn contains(&self, code: &str) -> bool {
        self.catalogue_codes.contains(code)
    }

    pub fn has_store(&self, code: &str) -> bool {
        self.store_codes.contains(code)
    }
}

/// First problem with a property value, if any
pub(crate) fn property_problem(property: &PropertyDefinition, value: &str) -> Option<String> {
    if let Some(allowed) = property.allowed() {
        if !allowed.contains(&value) {
            return Some(format!(
                "Value '{}' is not one of the allowed values for {}",
                value, property.name
            ));
        }
    }
    match property.value_type {
        PropertyValueType::Integer if value.parse::<i64>().is_err() => {
            Some(format!("{} should be a whole number", property.name))
        }
        PropertyValueType::Float if value.parse::<f64>().is_err() => {
            Some(format!("{} should be a number", property.name))
        }
        _ => None,
    }
}

/// Value as stored; booleans are normalized to `true` or `false`
pub(crate) fn stored_property(property: &PropertyDefinition, value: &str) -> String {
    match property.value_type {
        PropertyValueType::Boolean => {
            let truthy = value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes");
            truthy.to_string()
        }
        _ => value.to_string(),
    }
}

pub struct Normalizer<'a> {
    reference: &'a ReferenceData,
    properties: &'a [PropertyDefinition],
    mapping: ColumnMapping,
}

impl<'a> Normalizer<'a> {
    pub fn new(reference: &'a ReferenceData, properties: &'a [PropertyDefinition]) -> Self {
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

    /// Every check runs; messages accumulate in a fixed order.
    fn validate(&self, row: &ImportRow) -> Vec<String> {
        let mut errors = Vec::new();

        if row.asset_number.trim().is_empty() {
            errors.push("Asset number must be specified".to_string());
        }

        match row.catalogue_item_code.as_deref().map(str::trim) {
            None | Some("") => errors.push("Catalogue item code must be specified".to_string()),
            Some(code) if !self.reference.contains(code) => errors.push(format!(
                "Catalogue item code '{}' does not match any catalogue item",
                code
            )),
            Some(_) => {}
        }

        if let Some(date) = row.installation_date.as_deref() {
            if NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).is_err() {
                errors.push(format!(
                    "Installation date '{}' must be in YYYY-MM-DD format",
                    date
                ));
            }
        }

        if let Some(store) = row.store_code.as_deref() {
            if !self.reference.has_store(store) {
                errors.push(format!("Store code '{}' does not match any store", store));
            }
        }

        errors
    }

    fn copy_properties(&self, raw: &RawRow, row: &mut ImportRow) {
        for property in self.properties {
            let value = raw.by_header(&property.name);
            if value.is_empty() {
                continue;
            }
            if let Some(problem) = property_problem(property, value) {
                row.push_warning(&problem);
            }
            row.properties
                .insert(property.key.clone(), stored_property(property, value));
        }
    }
}

impl RowNormalizer for Normalizer<'_> {
    type Row = ImportRow;
    type Column = Field;

    fn mapping(&self) -> ColumnMapping {
        self.mapping
    }

    fn revalidate(&self, mut row: ImportRow) -> ImportRow {
        row.error_message = self.validate(&row).join(ERROR_SEPARATOR);
        row
    }

    fn normalize(&self, layout: &ColumnLayout, raw: &RawRow) -> ImportRow {
        let mut row = ImportRow {
            line_number: raw.line_number,
            ..Default::default()
        };

        if let Some(ref err) = raw.parse_error {
            row.id = RecordId::new(RecordKind::Asset).to_string();
            row.error_message = err.clone();
            return row;
        }

        // Identity
        let id = layout.cell(raw, Field::Id);
        if id.is_empty() {
            row.id = RecordId::new(RecordKind::Asset).to_string();
            row.is_update = false;
        } else {
            row.id = id.to_string();
            row.is_update = true;
        }

        row.asset_number = layout.cell(raw, Field::AssetNumber).to_string();
        row.catalogue_item_code = non_empty(layout.cell(raw, Field::CatalogueItemCode));
        row.installation_date = non_empty(layout.cell(raw, Field::InstallationDate));

        // Optional fields
        row.serial_number = non_empty(layout.cell(raw, Field::SerialNumber));
        row.notes = layout.cell(raw, Field::Notes).to_string();
        row.store_code = non_empty(layout.cell(raw, Field::StoreCode));
        self.copy_properties(raw, &mut row);

        row.error_message = self.validate(&row).join(ERROR_SEPARATOR);
        row
    }
}
