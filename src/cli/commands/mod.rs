//! CLI command implementations

pub mod catalogue;
pub mod completions;
pub mod import;
pub mod init;
pub mod list;
pub mod store;
pub mod template;
