//! Record identity system using type-prefixed ULIDs

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Record type prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Equipment / asset record
    Asset,
    /// Asset log entry (status history)
    Log,
}

impl RecordKind {
    /// Get the string representation of the prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Asset => "AST",
            RecordKind::Log => "LOG",
        }
    }

    /// Get all valid prefixes
    pub fn all() -> &'static [RecordKind] {
        &[RecordKind::Asset, RecordKind::Log]
    }

    /// Directory (relative to the project root) holding records of this kind
    pub fn directory(&self) -> &'static str {
        match self {
            RecordKind::Asset => "assets",
            RecordKind::Log => "logs",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AST" => Ok(RecordKind::Asset),
            "LOG" => Ok(RecordKind::Log),
            _ => Err(IdParseError::InvalidPrefix(s.to_string())),
        }
    }
}

/// A unique record identifier combining a type prefix and ULID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
    kind: RecordKind,
    ulid: Ulid,
}

impl RecordId {
    /// Create a new RecordId with the given prefix
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            ulid: Ulid::new(),
        }
    }

    /// Get the record kind
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Parse a RecordId from a string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.ulid)
    }
}

impl FromStr for RecordId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix_str, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        let kind = prefix_str.parse()?;
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;

        Ok(Self { kind, ulid })
    }
}

/// Errors that can occur when parsing record IDs
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid record prefix: '{0}' (valid: AST, LOG)")]
    InvalidPrefix(String),

    #[error("missing '-' delimiter in record ID: '{0}'")]
    MissingDelimiter(String),

    #[error("invalid ULID '{0}': {1}")]
    InvalidUlid(String, String),
}
