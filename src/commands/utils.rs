use crate::output::read_report;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::Path;

/// Validate a report JSON file
pub fn validate_report_file(file_path: &Path) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(file_path)
        .with_context(|| format!("Invalid report file {}", file_path.display()))?;

    let allocations: usize = report.lmem.iter().map(|g| g.allocations.len()).sum();
    let entries: usize = report.timestep.iter().map(|g| g.entries.len()).sum();

    println!("✓ Valid report JSON");
    println!("  Version: {}", report.version);
    println!("  Generated: {}", report.generated_at);
    println!(
        "  Sections: lmem={} summary={} timestep={}",
        report.valid.lmem, report.valid.summary, report.valid.timestep
    );
    println!("  Allocation groups: {} ({} allocations)", report.lmem.len(), allocations);
    println!("  Schedule groups: {} ({} entries)", report.timestep.len(), entries);
    for error in &report.errors {
        println!("  Error in {}: {}", error.section, error.message);
    }

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("LMEM Trace Studio Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string            - Schema version (e.g., '1.0.0')");
        println!("  lmem: array                - Allocation groups");
        println!("    settings: object         - shape_secs, allow_bank_conflict, chip geometry");
        println!("    allocations: array       - Resolved allocations (addr, size, bank_id, ...)");
        println!("  summary: object            - Memory statistics");
        println!("    groups: array            - Per-group statistics");
        println!("      stepStatistics: array  - Occupancy per timestep");
        println!("      summary: object        - Group totals and success rate");
        println!("    globalSummary: object?   - Cross-group totals");
        println!("  timestep: array            - Scheduling groups (by shape_secs)");
        println!("  chip: object?              - lmem_bytes, lmem_banks, lmem_bank_bytes");
        println!("  valid: object              - lmem / summary / timestep flags");
        println!("  errors: array              - Sections that failed to parse");
        println!("  success: bool              - No section failed");
        println!("  generated_at: string       - ISO 8601 timestamp");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("LMEM Trace Studio v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Local-memory allocation and timestep statistics for compiler trace logs.");
}
