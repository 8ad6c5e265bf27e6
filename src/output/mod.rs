//! Output writers for trace reports.
//!
//! This module handles writing reports to disk:
//! - Pretty JSON (default)
//! - Compact JSON

pub mod json;

// Re-export main functions
pub use json::{read_report, report_to_string, validate_path, write_report, write_report_compact};
