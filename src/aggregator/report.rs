//! Whole-log pipeline producing the output document.
//!
//! Classifies the log, parses each section independently, runs the
//! statistics engine and records per-section validity so callers can tell
//! an empty section from a failed one.

use super::memory_stats::MemoryStatistics;
use super::metrics::StatisticsReport;
use crate::parser::schema::{AllocationGroup, ChipSpec, TimestepGroup};
use crate::parser::{
    extract_valid_sections, parse_lmem_sections, parse_timestep_sections, split_profile_region,
};
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::ParseError;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Section name used in [`SectionError`] for the allocation section
pub const SECTION_LMEM: &str = "lmem";

/// Which sections produced usable output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionValidity {
    pub lmem: bool,
    pub summary: bool,
    pub timestep: bool,
}

/// A section that was present but failed to parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionError {
    pub section: String,
    pub message: String,
}

/// Top-level output document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceReport {
    /// Schema version
    pub version: String,

    /// Resolved allocation groups
    pub lmem: Vec<AllocationGroup>,

    /// Statistics engine output
    pub summary: StatisticsReport,

    /// Scheduling groups
    pub timestep: Vec<TimestepGroup>,

    pub chip: Option<ChipSpec>,

    pub valid: SectionValidity,

    #[serde(default)]
    pub errors: Vec<SectionError>,

    /// True when no present section failed
    pub success: bool,

    /// RFC 3339 creation time
    pub generated_at: String,
}

/// Run the full pipeline over a raw log
///
/// **Public** - main entry point of the library
///
/// # Arguments
/// * `raw_log` - Full text of the compiler log
///
/// # Returns
/// The report, possibly with some sections marked invalid
///
/// # Errors
/// * `ParseError::MissingConfiguration` - the allocation section needed a
///   chip spec and nothing else was valid
/// * `ParseError::NoValidData` - no section produced any data
pub fn build_report(raw_log: &str) -> Result<TraceReport, ParseError> {
    let (compute, profile) = split_profile_region(raw_log);
    if let Some(profile) = profile {
        info!("Skipping profile region ({} bytes)", profile.len());
    }

    let sections = extract_valid_sections(compute);
    debug!(
        "Classified {} allocation and {} scheduling records",
        sections.lmem_sections.len(),
        sections.timestep_sections.len()
    );

    let mut valid = SectionValidity::default();
    let mut errors = Vec::new();
    let mut first_error: Option<ParseError> = None;

    let mut lmem = Vec::new();
    let mut summary = StatisticsReport::default();

    if !sections.lmem_sections.is_empty() {
        match parse_lmem_sections(&sections.lmem_sections, sections.chip.as_ref()) {
            Ok(output) if !output.groups.is_empty() => {
                valid.lmem = true;

                let mut engine = MemoryStatistics::new();
                engine.set_lmem_data(output.groups, output.max_timestep);
                summary = engine.calculate_all_statistics().clone();
                valid.summary = true;

                lmem = engine.into_groups();
            }
            Ok(_) => debug!("Allocation section has no valid records"),
            Err(err) => {
                warn!("Allocation section failed: {}", err);
                errors.push(SectionError {
                    section: SECTION_LMEM.to_string(),
                    message: err.to_string(),
                });
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    let mut timestep = Vec::new();
    if !sections.timestep_sections.is_empty() {
        let output = parse_timestep_sections(&sections.timestep_sections);
        if output.groups.is_empty() {
            debug!("Scheduling section has no valid records");
        } else {
            valid.timestep = true;
            timestep = output.groups;
        }
    }

    if !valid.lmem && !valid.timestep {
        return Err(first_error.unwrap_or(ParseError::NoValidData));
    }

    info!(
        "Report built: {} allocation groups, {} scheduling groups",
        lmem.len(),
        timestep.len()
    );

    Ok(TraceReport {
        version: SCHEMA_VERSION.to_string(),
        lmem,
        summary,
        timestep,
        chip: sections.chip,
        valid,
        success: errors.is_empty(),
        errors,
        generated_at: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHIP: &str = "; action = lmem_assign; step = lmem_spec; lmem_bytes = 262144; lmem_banks = 16; lmem_bank_bytes = 16384\n";

    const ALLOC: &str = "; action = lmem_assign; tag = iteration_result; op_name = conv; addr = 0x0; size = 256; \
                         timestep_start = 0; timestep_end = 1; status = success; shape_secs = 1,1\n";

    const SCHEDULE: &str = "; action = timestep_cycle; debug_range = given\n\
                            ; action = timestep_cycle; step = timestep_cycle; tag = result; timestep = 0; \
                            timestep_type = layer; op = conv; cycle = 100\n";

    #[test]
    fn test_empty_log_is_no_valid_data() {
        assert!(matches!(build_report(""), Err(ParseError::NoValidData)));
        assert!(matches!(
            build_report("nothing to see here\n"),
            Err(ParseError::NoValidData)
        ));
    }

    #[test]
    fn test_allocations_without_chip() {
        let err = build_report(ALLOC).unwrap_err();
        assert!(matches!(err, ParseError::MissingConfiguration(_)));
    }

    #[test]
    fn test_chip_error_with_valid_schedule() {
        let log = format!("{ALLOC}{SCHEDULE}");
        let report = build_report(&log).unwrap();

        assert!(!report.valid.lmem);
        assert!(!report.valid.summary);
        assert!(report.valid.timestep);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].section, SECTION_LMEM);
        assert!(!report.success);
    }

    #[test]
    fn test_full_report() {
        let log = format!("{CHIP}{ALLOC}{SCHEDULE}");
        let report = build_report(&log).unwrap();

        assert_eq!(report.version, SCHEMA_VERSION);
        assert_eq!(
            report.valid,
            SectionValidity {
                lmem: true,
                summary: true,
                timestep: true
            }
        );
        assert!(report.success);
        assert_eq!(report.lmem.len(), 1);
        assert_eq!(report.summary.groups[0].step_statistics.len(), 2);
        assert_eq!(report.timestep[0].entries.len(), 1);
        assert_eq!(report.chip.and_then(|c| c.lmem_bank_bytes), Some(16384));
    }

    #[test]
    fn test_profile_region_ignored() {
        let log = format!("{CHIP}{ALLOC}=====\nStart_Time: 0\n{ALLOC}");
        let report = build_report(&log).unwrap();
        assert_eq!(report.lmem[0].allocations.len(), 1);
    }
}
