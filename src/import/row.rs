//! Row types shared by the import pipeline

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Separator used when several validator messages apply to one row
pub const ERROR_SEPARATOR: &str = "; ";

/// Lines occupied by the header; a data row's line number is its 0-based
/// ordinal plus this offset.
pub const LINE_NUMBER_OFFSET: usize = 2;

/// A buffered row the session, submitter and router can move around.
///
/// Validation and submission failures are both carried as the row's error
/// message; a row with an empty message is importable.
pub trait StagedRow: Clone + fmt::Debug + Send + Sync + 'static {
    /// Identifier used to edit or remove the row during review
    fn id(&self) -> &str;

    /// Line of the source file this row was read from
    fn line_number(&self) -> usize;

    fn error_message(&self) -> &str;

    fn set_error_message(&mut self, message: String);

    fn warning_message(&self) -> &str;

    fn warning_message_mut(&mut self) -> &mut String;

    /// True when submitting the row changes an existing record
    fn is_update(&self) -> bool {
        false
    }

    fn has_error(&self) -> bool {
        !self.error_message().is_empty()
    }

    fn has_warning(&self) -> bool {
        !self.warning_message().is_empty()
    }

    /// Copy of this row carrying a submission failure message
    fn with_error(&self, message: impl Into<String>) -> Self {
        let mut row = self.clone();
        row.set_error_message(message.into());
        row
    }

    /// Append a warning, keeping any existing ones
    fn push_warning(&mut self, message: &str) {
        let warnings = self.warning_message_mut();
        if !warnings.is_empty() {
            warnings.push_str(ERROR_SEPARATOR);
        }
        warnings.push_str(message);
    }
}

/// One candidate asset awaiting import
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportRow {
    /// Existing identifier (update) or a freshly generated one (create)
    pub id: String,

    /// True when the source file supplied a non-empty id
    pub is_update: bool,

    /// Line of the source file this row was read from
    pub line_number: usize,

    pub asset_number: String,
    pub catalogue_item_code: Option<String>,
    pub serial_number: Option<String>,
    /// Installation date as `YYYY-MM-DD`
    pub installation_date: Option<String>,
    pub notes: String,

    /// Store the asset is located in
    pub store_code: Option<String>,

    /// Dynamic properties keyed by property key
    pub properties: BTreeMap<String, String>,

    /// Empty when the row is valid
    pub error_message: String,

    /// Non-fatal notices
    pub warning_message: String,
}

impl StagedRow for ImportRow {
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

    fn is_update(&self) -> bool {
        self.is_update
    }
}

/// Value type of a dynamic property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValueType {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
}

/// Externally supplied definition of a dynamic property column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Key the value is stored under
    pub key: String,

    /// Column header the value is read from
    pub name: String,

    #[serde(default)]
    pub value_type: PropertyValueType,

    /// Comma-separated list of permitted values, if restricted
    #[serde(default)]
    pub allowed_values: Option<String>,
}

impl PropertyDefinition {
    pub fn allowed(&self) -> Option<Vec<&str>> {
        self.allowed_values
            .as_deref()
            .map(|values| values.split(',').map(str::trim).collect())
    }
}

/// One parsed data line, before normalization
#[derive(Debug, Clone)]
pub struct RawRow {
    /// Line number as used throughout the import (see [`LINE_NUMBER_OFFSET`])
    pub line_number: usize,

    cells: Vec<String>,
    headers: Arc<HeaderIndex>,

    /// Set when the line could not be decoded
    pub parse_error: Option<String>,
}

impl RawRow {
    pub fn new(line_number: usize, cells: Vec<String>, headers: Arc<HeaderIndex>) -> Self {
        Self {
            line_number,
            cells,
            headers,
            parse_error: None,
        }
    }

    pub fn unreadable(
        line_number: usize,
        headers: Arc<HeaderIndex>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            line_number,
            cells: Vec::new(),
            headers,
            parse_error: Some(error.into()),
        }
    }

    /// Cell at a fixed column position, trimmed
    pub fn get(&self, index: usize) -> &str {
        self.cells.get(index).map(|s| s.trim()).unwrap_or("")
    }

    /// Cell under the named header, trimmed
    pub fn by_header(&self, name: &str) -> &str {
        self.headers
            .position(name)
            .map(|idx| self.get(idx))
            .unwrap_or("")
    }

    pub fn headers(&self) -> &HeaderIndex {
        &self.headers
    }

    pub fn is_blank(&self) -> bool {
        self.parse_error.is_none() && self.cells.iter().all(|c| c.trim().is_empty())
    }
}

/// Header names of the uploaded file with a case-insensitive lookup
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut positions = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            positions.entry(Self::key(name)).or_insert(i);
        }
        Self { names, positions }
    }

    fn key(name: &str) -> String {
        name.trim().to_lowercase()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(&Self::key(name)).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let headers = Arc::new(HeaderIndex::new(["id", "Asset Number", "Colour"]));
        let row = RawRow::new(2, vec!["".into(), " A-1 ".into(), "red".into()], headers);

        assert_eq!(row.by_header("asset number"), "A-1");
        assert_eq!(row.by_header("COLOUR"), "red");
        assert_eq!(row.by_header("missing"), "");
        assert_eq!(row.get(1), "A-1");
        assert_eq!(row.get(9), "");
    }

    #[test]
    fn test_blank_row() {
        let headers = Arc::new(HeaderIndex::new(["a", "b"]));
        assert!(RawRow::new(2, vec![" ".into(), "".into()], headers.clone()).is_blank());
        assert!(!RawRow::unreadable(3, headers, "bad bytes").is_blank());
    }

    #[test]
    fn test_push_warning_joins() {
        let mut row = ImportRow::default();
        row.push_warning("first");
        row.push_warning("second");
        assert_eq!(row.warning_message, "first; second");
    }

    #[test]
    fn test_with_error_keeps_fields() {
        let row = ImportRow {
            id: "AST-1".into(),
            line_number: 5,
            store_code: Some("ST-1".into()),
            ..Default::default()
        };
        let failed = row.with_error("AssetNumberAlreadyExists");
        assert!(failed.has_error());
        assert_eq!(failed.line_number(), 5);
        assert_eq!(failed.store_code.as_deref(), Some("ST-1"));
        assert!(!row.has_error());
    }

    #[test]
    fn test_allowed_values_split() {
        let def = PropertyDefinition {
            key: "energy".into(),
            name: "Energy Source".into(),
            value_type: PropertyValueType::String,
            allowed_values: Some("Electricity, Solar,Gas".into()),
        };
        assert_eq!(def.allowed().unwrap(), vec!["Electricity", "Solar", "Gas"]);
    }
}
