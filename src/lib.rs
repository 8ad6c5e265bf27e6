//! LMEM Trace Studio
//!
//! Local-memory allocation statistics for hardware compiler trace logs.
//!
//! This crate provides the core implementation for the
//! `lmem-trace` CLI tool: record classification, allocation grouping and
//! conflict resolution, and time-sliced memory statistics.
//!
//! ## Getting Started
//!
//! ```bash
//! lmem-trace parse compile.log --summary
//! lmem-trace --help
//! ```
//!
//! As a library:
//!
//! ```ignore
//! let report = lmem_trace_studio::build_report(&raw_log)?;
//! lmem_trace_studio::output::write_report(&report, "compile_parsed.json")?;
//! ```

pub mod aggregator;
pub mod commands;
pub mod output;
pub mod parser;
pub mod utils;

pub use aggregator::{build_report, MemoryStatistics, TraceReport};
pub use utils::{OutputError, ParseError};
