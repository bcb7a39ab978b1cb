//! AIT: Asset Import Toolkit
//!
//! Bulk-loads asset records from CSV files into a project registry stored as
//! plain YAML files. The import engine in [`import`] is independent of the
//! storage in [`store`] and talks to it only through async traits.

pub mod cli;
pub mod core;
pub mod import;
pub mod store;
