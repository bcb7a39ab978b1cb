//! Batch import engine
//!
//! A CSV upload flows through these stages:
//!
//! 1. [`RowParser`] reads the file in byte-bounded chunks
//! 2. A [`RowNormalizer`] turns each raw row into a staged row and validates it
//! 3. [`ImportSession`] holds the buffer while the operator reviews it
//! 4. [`BatchSubmitter`] drains the buffer in fixed-size concurrent waves
//! 5. [`router::route`] puts failed rows back into the buffer
//!
//! Assets ([`ImportRow`], [`Normalizer`], [`AssetWriter`]) and catalogue items
//! ([`CatalogueRow`], [`CatalogueNormalizer`], [`CatalogueWriter`]) share every
//! stage. Storage is reached only through the traits in [`remote`].

pub mod catalogue;
pub mod error;
pub mod export;
pub mod normalizer;
pub mod parser;
pub mod progress;
pub mod remote;
pub mod router;
pub mod row;
pub mod session;
pub mod submitter;

pub use catalogue::{
    CatalogueColumn, CatalogueNormalizer, CatalogueReference, CatalogueRow, CatalogueWriter,
    CATALOGUE_WAVE_SIZE,
};
pub use error::ImportError;
pub use export::{export_template, export_with_errors, CsvRecord};
pub use normalizer::{
    Column, ColumnLayout, ColumnMapping, Field, Normalizer, ReferenceData, RowNormalizer,
};
pub use parser::{RowChunks, RowParser};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use remote::{
    AssetInput, AssetLogInput, AssetService, CacheInvalidator, CatalogueItemInput,
    CatalogueService, LogDefaults, LogStatus, NoopInvalidator, ReferenceSource, RemoteError,
};
pub use router::RouteOutcome;
pub use row::{ImportRow, PropertyDefinition, PropertyValueType, StagedRow};
pub use session::{ImportSession, Phase, SessionError, SubmissionBatch};
pub use submitter::{AssetWriter, BatchResult, BatchSubmitter, DrainReport, RowWriter};
