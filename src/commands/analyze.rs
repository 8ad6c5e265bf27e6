//! Parse command implementation.
//!
//! The parse command:
//! 1. Reads the compiler log
//! 2. Builds the report (classify, decode, resolve, statistics)
//! 3. Writes the JSON document

use super::models::ParseArgs;
use crate::aggregator::report::{build_report, TraceReport};
use crate::output::{write_report, write_report_compact};
use crate::utils::config::DEFAULT_OUTPUT_SUFFIX;
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Execute the parse command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Parse command arguments
///
/// # Returns
/// Path of the written report
///
/// # Errors
/// * Log file cannot be read
/// * No section of the log holds valid data
/// * Report cannot be written
pub fn execute_parse(args: ParseArgs) -> Result<PathBuf> {
    let start_time = Instant::now();

    info!("Analyzing log: {}", args.log_file.display());

    // Step 1: Read the log
    info!("Step 1/3: Reading log file...");
    let bytes = std::fs::read(&args.log_file)
        .with_context(|| format!("Failed to read log file {}", args.log_file.display()))?;
    let raw_log = String::from_utf8_lossy(&bytes);
    debug!("Read {} bytes", bytes.len());

    // Step 2: Build the report
    info!("Step 2/3: Parsing trace sections...");
    let report = build_report(&raw_log).context("Failed to parse log file")?;

    for error in &report.errors {
        info!("Section '{}' skipped: {}", error.section, error.message);
    }

    // Step 3: Write output
    info!("Step 3/3: Writing report...");
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.log_file));

    let written = if args.compact {
        write_report_compact(&report, &output)
    } else {
        write_report(&report, &output)
    };
    written.context("Failed to write report JSON")?;

    info!("✓ Report written to: {}", output.display());

    if args.print_summary {
        print_summary(&args.log_file, &report);
    }

    let elapsed = start_time.elapsed();
    info!("Parse completed in {:.2}s", elapsed.as_secs_f64());

    Ok(output)
}

/// Validate parse arguments
///
/// **Public** - can be called before execute_parse for early validation
pub fn validate_args(args: &ParseArgs) -> Result<()> {
    if args.log_file.as_os_str().is_empty() {
        anyhow::bail!("Log file path cannot be empty");
    }

    if !args.log_file.exists() {
        anyhow::bail!("Log file not found: {}", args.log_file.display());
    }

    if args.log_file.is_dir() {
        anyhow::bail!("Log file is a directory: {}", args.log_file.display());
    }

    if let Some(output) = &args.output {
        if output == &args.log_file {
            anyhow::bail!("Output path must differ from the log file");
        }
    }

    Ok(())
}

/// `<dir>/<stem>_parsed.json` next to the log file
pub fn default_output_path(log_file: &Path) -> PathBuf {
    let stem = log_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace".to_string());

    log_file.with_file_name(format!("{stem}{DEFAULT_OUTPUT_SUFFIX}"))
}

/// **Private** - text summary for `--summary`
fn print_summary(log_file: &Path, report: &TraceReport) {
    println!("\n{}", "=".repeat(80));
    println!("LMEM TRACE SUMMARY");
    println!("{}", "=".repeat(80));
    println!("Log:              {}", log_file.display());
    println!("Allocation groups: {}", report.lmem.len());
    println!("Schedule groups:   {}", report.timestep.len());

    if let Some(global) = &report.summary.global_summary {
        println!("Total allocations: {}", global.total_allocations);
        println!("Max memory usage:  {} bytes", global.max_memory_usage);
        println!("Avg success rate:  {:.1}%", global.avg_success_rate);
    }

    for group in &report.summary.groups {
        println!(
            "\n  {} -> {} steps, peak {} bytes, footprint {} bytes, {:.1}% success",
            group.settings.configuration.settings_key(),
            group.step_statistics.len(),
            group.summary.max_memory_usage,
            group.summary.total_memory_footprint,
            group.summary.success_rate
        );
    }

    println!("{}", "=".repeat(80));
}
