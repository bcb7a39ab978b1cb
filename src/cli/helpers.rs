//! Shared helper functions for CLI commands

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::project::Project;

/// Locate the project from `--project` or the current directory
pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    let project = match &global.project {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    };
    project.map_err(|e| miette::miette!("{}", e))
}

/// Format a string ID for display, truncating if too long
///
/// Record ids are 30 characters; tables only need enough to tell them apart.
pub fn format_short_id_str(id: &str) -> String {
    truncate_str(id, 16)
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render an optional cell, using "-" when absent
pub fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}
