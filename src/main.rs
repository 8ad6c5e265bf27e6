//! LMEM Trace Studio CLI
//!
//! Turns compiler trace logs into local-memory allocation statistics.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use lmem_trace_studio::commands::{
    display_schema, display_version, execute_parse, validate_args, validate_report_file, ParseArgs,
};

/// LMEM Trace Studio - local-memory statistics from compiler trace logs
#[derive(Parser, Debug)]
#[command(name = "lmem-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a compiler log into a JSON report
    Parse {
        /// Compiler log file
        log_file: PathBuf,

        /// Output path for the JSON report (default: <log stem>_parsed.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,

        /// Write compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Parse {
            log_file,
            output,
            summary,
            compact,
        } => {
            let args = ParseArgs {
                log_file,
                output,
                print_summary: summary,
                compact,
            };

            validate_args(&args)?;
            execute_parse(args)?;
        }

        Commands::Validate { file } => {
            validate_report_file(&file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
