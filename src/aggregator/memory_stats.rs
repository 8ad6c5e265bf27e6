//! Cached statistics engine over resolved allocation groups.

use super::metrics::{
    calculate_global_summary, calculate_group_summary, calculate_step_statistics, GlobalSummary,
    GroupStatistics, GroupSummary, StatisticsReport,
};
use crate::parser::schema::{AllocationGroup, GroupSettings};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// One row of a side-by-side comparison of group configurations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsComparison {
    pub settings_key: String,
    pub settings: GroupSettings,
    pub summary: GroupSummary,
}

/// Memory statistics engine
///
/// Holds the resolved groups and the global timestep bound. The full
/// [`StatisticsReport`] is computed on first request and reused until the
/// engine is reseeded or cleared.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatistics {
    groups: Vec<AllocationGroup>,
    ts_counts: i64,
    cache: Option<StatisticsReport>,
}

impl MemoryStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the engine input and drop any cached statistics
    ///
    /// # Arguments
    /// * `groups` - Resolved allocation groups, in trace order
    /// * `ts_counts` - Largest timestep across all groups
    pub fn set_lmem_data(&mut self, groups: Vec<AllocationGroup>, ts_counts: i64) {
        debug!(
            "Seeding statistics engine with {} groups, ts_counts {}",
            groups.len(),
            ts_counts
        );
        self.groups = groups;
        self.ts_counts = ts_counts;
        self.cache = None;
    }

    /// Compute (or return the cached) statistics for every group
    ///
    /// **Public** - main entry point of the engine
    ///
    /// Repeated calls without reseeding return the same cached report.
    pub fn calculate_all_statistics(&mut self) -> &StatisticsReport {
        let groups = &self.groups;
        let ts_counts = self.ts_counts;
        self.cache
            .get_or_insert_with(|| compute_report(groups, ts_counts))
    }

    /// Per-group statistics, computing them if needed
    pub fn statistics(&mut self) -> &[GroupStatistics] {
        &self.calculate_all_statistics().groups
    }

    /// Statistics of the first group whose settings key matches
    ///
    /// A configuration can recur in several non-adjacent groups; only the
    /// first one is returned.
    pub fn statistics_by_settings(&mut self, settings_key: &str) -> Option<&GroupStatistics> {
        self.statistics()
            .iter()
            .find(|group| group.settings.configuration.settings_key() == settings_key)
    }

    /// Summary of every group next to its settings, in group order
    pub fn settings_comparison(&mut self) -> Vec<SettingsComparison> {
        self.statistics()
            .iter()
            .map(|group| SettingsComparison {
                settings_key: group.settings.configuration.settings_key(),
                settings: group.settings.clone(),
                summary: group.summary.clone(),
            })
            .collect()
    }

    /// Cross-group summary (None without groups)
    pub fn global_summary(&mut self) -> Option<&GlobalSummary> {
        self.calculate_all_statistics().global_summary.as_ref()
    }

    pub fn groups(&self) -> &[AllocationGroup] {
        &self.groups
    }

    /// Consume the engine, returning its groups without copying
    pub fn into_groups(self) -> Vec<AllocationGroup> {
        self.groups
    }

    pub fn ts_counts(&self) -> i64 {
        self.ts_counts
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Drop the input and the cache
    pub fn clear(&mut self) {
        self.groups.clear();
        self.ts_counts = 0;
        self.cache = None;
    }
}

/// Build the full report from scratch
///
/// **Private** - steps run from 0 to each group's own `max_timestep`; the
/// wraparound bound is always the global `ts_counts`
fn compute_report(groups: &[AllocationGroup], ts_counts: i64) -> StatisticsReport {
    let group_stats: Vec<GroupStatistics> = groups
        .iter()
        .map(|group| {
            let settings_key = group.settings.configuration.settings_key();
            let step_statistics: Vec<_> = (0..=group.max_timestep())
                .map(|step| {
                    calculate_step_statistics(&group.allocations, step, &settings_key, ts_counts)
                })
                .collect();
            let summary = calculate_group_summary(&step_statistics, &group.allocations);

            debug!(
                "Group {}: {} steps, {} allocations",
                settings_key,
                step_statistics.len(),
                summary.total_allocations
            );

            GroupStatistics {
                settings: group.settings.clone(),
                step_statistics,
                summary,
            }
        })
        .collect();

    let global_summary = calculate_global_summary(&group_stats);

    info!("Computed memory statistics for {} groups", group_stats.len());

    StatisticsReport {
        groups: group_stats,
        global_summary,
    }
}
