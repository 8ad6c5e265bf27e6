//! Aggregation of resolved allocations into memory statistics.
//!
//! This module turns parsed trace data into:
//! - Per-step occupancy, bank usage and fragmentation
//! - Per-group and global summaries (cached by the engine)
//! - The complete output document

pub mod memory_stats;
pub mod metrics;
pub mod report;

// Re-export main types and functions
pub use memory_stats::{MemoryStatistics, SettingsComparison};
pub use metrics::{
    calculate_global_summary, calculate_group_summary, calculate_step_statistics, fragmentation,
    is_allocation_active, BankStatistic, DetailedStats, GlobalSummary, GroupStatistics,
    GroupSummary, StatisticsReport, StepStatistic,
};
pub use report::{build_report, SectionError, SectionValidity, TraceReport};
