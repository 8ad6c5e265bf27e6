//! JSON report writer and reader.
//!
//! Writes [`TraceReport`] documents to disk, pretty or compact.

use crate::aggregator::report::TraceReport;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write a report to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `report` - Report to write
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path is empty, a directory, or its parent
///   cannot be created
///
/// # Example
/// ```ignore
/// let report = build_report(&raw_log)?;
/// write_report(&report, "trace_parsed.json")?;
/// ```
pub fn write_report(
    report: &TraceReport,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    write_with(report, output_path.as_ref(), true)
}

/// Write a report as compact JSON (no formatting)
///
/// **Public** - for large traces where file size matters
pub fn write_report_compact(
    report: &TraceReport,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    write_with(report, output_path.as_ref(), false)
}

/// Serialize a report to a pretty JSON string
pub fn report_to_string(report: &TraceReport) -> Result<String, OutputError> {
    serde_json::to_string_pretty(report).map_err(OutputError::SerializationFailed)
}

/// Read a report from a JSON file
///
/// **Public** - used by the `validate` command and tests
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (I/O errors share this variant)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_report(input_path: impl AsRef<Path>) -> Result<TraceReport, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading report from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;

    let report: TraceReport =
        serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)?;

    debug!(
        "Report loaded: version {}, {} allocation groups",
        report.version,
        report.lmem.len()
    );

    Ok(report)
}

/// Check that a path can be written as a report
///
/// **Public** - rejects empty paths and existing directories; a missing
/// parent directory is fine and gets created on write
pub fn validate_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Parent directory will be created: {}", parent.display());
        }
    }

    Ok(())
}

/// **Private** - shared body of the pretty and compact writers
fn write_with(report: &TraceReport, output_path: &Path, pretty: bool) -> Result<(), OutputError> {
    info!("Writing report to: {}", output_path.display());

    validate_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);

    let serialized = if pretty {
        serde_json::to_writer_pretty(&mut writer, report)
    } else {
        serde_json::to_writer(&mut writer, report)
    };
    serialized.map_err(OutputError::SerializationFailed)?;

    writer.flush()?;

    info!(
        "Report written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// **Private** - internal utility
fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
