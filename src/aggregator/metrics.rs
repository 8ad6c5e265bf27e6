//! Memory occupancy metrics over resolved allocation groups.
//!
//! Every metric here is a pure function of a set of allocations. The
//! statistics engine in `memory_stats` drives them step by step and caches
//! the result.

use crate::parser::schema::{GroupSettings, LmemAllocation};
use crate::utils::config::UNKNOWN_LMEM_TYPE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Usage of one bank at one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankStatistic {
    pub used_memory: u64,
    pub allocation_count: usize,
    pub average_allocation_size: f64,
    pub largest_allocation: u64,
}

/// Success, size, fragmentation and type breakdown of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedStats {
    pub successful_allocations: usize,
    pub failed_allocations: usize,

    /// 0-100
    pub success_rate: f64,

    pub average_allocation_size: f64,

    /// Gap bytes between address-adjacent allocations, as 0-100 of total memory
    pub memory_fragmentation: f64,

    /// Count per `lmem_type`; unlabeled allocations count as "unknown"
    pub allocation_types: BTreeMap<String, usize>,
}

/// Memory snapshot of one group at one timestep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStatistic {
    pub step: i64,
    pub settings_key: String,

    /// High-water byte extent of the active set, not a fixed capacity
    pub total_memory: u64,
    pub used_memory: u64,
    pub free_memory: u64,

    #[serde(alias = "memoryUsagePercentage")]
    pub usage_percentage: f64,

    /// Largest single active allocation
    pub peak_memory: u64,

    pub allocation_count: usize,
    pub active_allocations: usize,
    pub bank_statistics: BTreeMap<u64, BankStatistic>,
    pub detailed_stats: DetailedStats,
}

/// Whole-group summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub total_allocations: usize,
    pub successful_allocations: usize,
    pub failed_allocations: usize,
    pub success_rate: f64,
    pub max_memory_usage: u64,
    pub average_memory_usage: f64,
    pub peak_allocation_count: usize,

    /// Max end address over every allocation of the group
    pub total_memory_footprint: u64,
}

/// Statistics for one allocation group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatistics {
    pub settings: GroupSettings,
    pub step_statistics: Vec<StepStatistic>,
    pub summary: GroupSummary,
}

/// Cross-group summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSummary {
    pub total_groups: usize,
    pub max_memory_usage: u64,
    pub total_allocations: usize,

    /// Unweighted mean of the group success rates
    pub avg_success_rate: f64,
}

/// Engine output: per-group statistics plus the global summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReport {
    pub groups: Vec<GroupStatistics>,

    /// None when there are no groups
    pub global_summary: Option<GlobalSummary>,
}

/// Check whether an allocation occupies memory at a step
///
/// **Public** - the liveness rule used for every step statistic
///
/// # Arguments
/// * `allocation` - Resolved allocation
/// * `step` - Discrete timestep
/// * `ts_counts` - Largest timestep across all groups
///
/// `hold_in_lmem` allocations are always live. A lifetime with
/// `timestep_start > timestep_end` wraps: it runs from the start to
/// `ts_counts`, then from 0 to the end.
pub fn is_allocation_active(allocation: &LmemAllocation, step: i64, ts_counts: i64) -> bool {
    if allocation.hold_in_lmem {
        return true;
    }

    let (start, end) = (allocation.timestep_start, allocation.timestep_end);
    if start <= end {
        (start..=end).contains(&step)
    } else {
        (start..=ts_counts).contains(&step) || (0..=end).contains(&step)
    }
}

/// Allocations live at `step`, in group order
pub fn active_allocations(
    allocations: &[LmemAllocation],
    step: i64,
    ts_counts: i64,
) -> Vec<&LmemAllocation> {
    allocations
        .iter()
        .filter(|alloc| is_allocation_active(alloc, step, ts_counts))
        .collect()
}

/// Highest end address (0 when empty)
pub fn total_memory(allocations: &[&LmemAllocation]) -> u64 {
    allocations
        .iter()
        .map(|alloc| alloc.end_addr())
        .max()
        .unwrap_or(0)
}

/// Sum of sizes, saturating at `u64::MAX`
pub fn used_memory(allocations: &[&LmemAllocation]) -> u64 {
    allocations
        .iter()
        .fold(0u64, |total, alloc| total.saturating_add(alloc.size))
}

/// Largest single size (0 when empty)
pub fn largest_allocation(allocations: &[&LmemAllocation]) -> u64 {
    allocations
        .iter()
        .map(|alloc| alloc.size)
        .max()
        .unwrap_or(0)
}

pub fn average_allocation_size(allocations: &[&LmemAllocation]) -> f64 {
    if allocations.is_empty() {
        return 0.0;
    }
    let total: f64 = allocations.iter().map(|alloc| alloc.size as f64).sum();
    total / allocations.len() as f64
}

/// `part / whole * 100`, or 0 when `whole` is 0
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part / whole) * 100.0
    } else {
        0.0
    }
}

/// Fragmentation of a set of allocations
///
/// **Public** - gap bytes between address-sorted neighbours, as a
/// percentage of `total_memory`. Overlaps count as zero gap. Fewer than two
/// allocations always yield 0.
pub fn fragmentation(allocations: &[&LmemAllocation]) -> f64 {
    if allocations.len() < 2 {
        return 0.0;
    }

    let mut sorted = allocations.to_vec();
    sorted.sort_by_key(|alloc| alloc.addr);

    let total_gap: u64 = sorted
        .windows(2)
        .map(|pair| pair[1].addr.saturating_sub(pair[0].end_addr()))
        .sum();

    percentage(total_gap as f64, total_memory(allocations) as f64)
}

/// Count allocations per `lmem_type`
pub fn count_allocation_types(allocations: &[&LmemAllocation]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for alloc in allocations {
        let label = alloc.lmem_type.as_deref().unwrap_or(UNKNOWN_LMEM_TYPE);
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Per-bank usage of a set of allocations
pub fn bank_statistics(allocations: &[&LmemAllocation]) -> BTreeMap<u64, BankStatistic> {
    let mut by_bank: BTreeMap<u64, Vec<&LmemAllocation>> = BTreeMap::new();
    for &alloc in allocations {
        by_bank.entry(alloc.bank_id).or_default().push(alloc);
    }

    by_bank
        .into_iter()
        .map(|(bank_id, bank)| {
            let stats = BankStatistic {
                used_memory: used_memory(&bank),
                allocation_count: bank.len(),
                average_allocation_size: average_allocation_size(&bank),
                largest_allocation: largest_allocation(&bank),
            };
            (bank_id, stats)
        })
        .collect()
}

/// Detailed breakdown of a set of allocations
pub fn detailed_statistics(allocations: &[&LmemAllocation]) -> DetailedStats {
    let successful = allocations.iter().filter(|alloc| alloc.is_success()).count();

    DetailedStats {
        successful_allocations: successful,
        failed_allocations: allocations.len() - successful,
        success_rate: percentage(successful as f64, allocations.len() as f64),
        average_allocation_size: average_allocation_size(allocations),
        memory_fragmentation: fragmentation(allocations),
        allocation_types: count_allocation_types(allocations),
    }
}

/// Compute the snapshot of a group at one step
///
/// **Public** - building block of the engine
///
/// # Arguments
/// * `allocations` - The group's resolved allocations
/// * `step` - Timestep to evaluate
/// * `settings_key` - Key of the group's configuration
/// * `ts_counts` - Largest timestep across all groups (wraparound bound)
pub fn calculate_step_statistics(
    allocations: &[LmemAllocation],
    step: i64,
    settings_key: &str,
    ts_counts: i64,
) -> StepStatistic {
    let active = active_allocations(allocations, step, ts_counts);
    let total = total_memory(&active);
    let used = used_memory(&active);

    StepStatistic {
        step,
        settings_key: settings_key.to_string(),
        total_memory: total,
        used_memory: used,
        free_memory: total.saturating_sub(used),
        usage_percentage: percentage(used as f64, total as f64),
        peak_memory: largest_allocation(&active),
        allocation_count: active.len(),
        active_allocations: active.len(),
        bank_statistics: bank_statistics(&active),
        detailed_stats: detailed_statistics(&active),
    }
}

/// Summarise a group over all its steps and allocations
pub fn calculate_group_summary(
    step_statistics: &[StepStatistic],
    allocations: &[LmemAllocation],
) -> GroupSummary {
    let all: Vec<&LmemAllocation> = allocations.iter().collect();
    let successful = all.iter().filter(|alloc| alloc.is_success()).count();

    let max_memory_usage = step_statistics
        .iter()
        .map(|stat| stat.used_memory)
        .max()
        .unwrap_or(0);

    let average_memory_usage = if step_statistics.is_empty() {
        0.0
    } else {
        let sum: f64 = step_statistics
            .iter()
            .map(|stat| stat.used_memory as f64)
            .sum();
        sum / step_statistics.len() as f64
    };

    let peak_allocation_count = step_statistics
        .iter()
        .map(|stat| stat.allocation_count)
        .max()
        .unwrap_or(0);

    GroupSummary {
        total_allocations: all.len(),
        successful_allocations: successful,
        failed_allocations: all.len() - successful,
        success_rate: percentage(successful as f64, all.len() as f64),
        max_memory_usage,
        average_memory_usage,
        peak_allocation_count,
        total_memory_footprint: total_memory(&all),
    }
}

/// Summarise across groups
///
/// **Public** - None when there are no groups
///
/// `avg_success_rate` is the plain mean of the group rates, so a group with
/// one allocation weighs as much as a group with thousands.
pub fn calculate_global_summary(groups: &[GroupStatistics]) -> Option<GlobalSummary> {
    if groups.is_empty() {
        return None;
    }

    let max_memory_usage = groups
        .iter()
        .flat_map(|group| group.step_statistics.iter())
        .map(|stat| stat.used_memory)
        .max()
        .unwrap_or(0);

    let total_allocations = groups
        .iter()
        .map(|group| group.summary.total_allocations)
        .sum();

    let rate_sum: f64 = groups.iter().map(|group| group.summary.success_rate).sum();

    Some(GlobalSummary {
        total_groups: groups.len(),
        max_memory_usage,
        total_allocations,
        avg_success_rate: rate_sum / groups.len() as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(addr: u64, size: u64, start: i64, end: i64) -> LmemAllocation {
        LmemAllocation {
            op_name: format!("op_{addr}"),
            op_type: None,
            addr,
            size,
            timestep_start: start,
            timestep_end: end,
            lmem_type: None,
            hold_in_lmem: false,
            status: "success".to_string(),
            tag: "iteration_result".to_string(),
            bank_id: 0,
            max_timestep: end.max(start),
        }
    }

    #[test]
    fn test_wraparound_liveness() {
        let a = alloc(0, 16, 8, 2);
        let active: Vec<i64> = (0..=10).filter(|&s| is_allocation_active(&a, s, 10)).collect();
        assert_eq!(active, vec![0, 1, 2, 8, 9, 10]);
    }

    #[test]
    fn test_hold_in_lmem_always_active() {
        let mut a = alloc(0, 16, 5, 6);
        a.hold_in_lmem = true;
        assert!((0..=20).all(|s| is_allocation_active(&a, s, 20)));
    }

    #[test]
    fn test_plain_lifetime_inclusive() {
        let a = alloc(0, 16, 2, 4);
        assert!(!is_allocation_active(&a, 1, 10));
        assert!(is_allocation_active(&a, 2, 10));
        assert!(is_allocation_active(&a, 4, 10));
        assert!(!is_allocation_active(&a, 5, 10));
    }

    #[test]
    fn test_fragmentation_no_gaps() {
        let a = alloc(0, 32, 0, 1);
        let b = alloc(32, 32, 0, 1);
        let c = alloc(64, 16, 0, 1);
        assert_eq!(fragmentation(&[&c, &a, &b]), 0.0);
    }

    #[test]
    fn test_fragmentation_single_allocation() {
        let a = alloc(100, 32, 0, 1);
        assert_eq!(fragmentation(&[&a]), 0.0);
    }

    #[test]
    fn test_fragmentation_with_gap() {
        let a = alloc(0, 50, 0, 1);
        let b = alloc(75, 25, 0, 1);
        // 25 gap bytes over a 100 byte extent
        assert_eq!(fragmentation(&[&b, &a]), 25.0);
    }

    #[test]
    fn test_fragmentation_overlap_counts_zero() {
        let a = alloc(0, 64, 0, 1);
        let b = alloc(32, 64, 0, 1);
        assert_eq!(fragmentation(&[&a, &b]), 0.0);
    }

    #[test]
    fn test_step_statistics_memory_fields() {
        let mut labelled = alloc(200, 50, 0, 3);
        labelled.lmem_type = Some("LMEM_WEIGHT".to_string());
        labelled.bank_id = 1;
        let mut failed = alloc(250, 10, 0, 3);
        failed.status = "failed".to_string();
        failed.bank_id = 1;
        let allocations = vec![alloc(0, 100, 0, 3), labelled, failed, alloc(400, 8, 5, 6)];

        let stat = calculate_step_statistics(&allocations, 1, "key", 6);

        assert_eq!(stat.step, 1);
        assert_eq!(stat.total_memory, 260);
        assert_eq!(stat.used_memory, 160);
        assert_eq!(stat.free_memory, 100);
        assert_eq!(stat.usage_percentage, 160.0 / 260.0 * 100.0);
        assert_eq!(stat.peak_memory, 100);
        assert_eq!(stat.allocation_count, 3);
        assert_eq!(stat.active_allocations, 3);
        assert_eq!(stat.bank_statistics.len(), 2);
        assert_eq!(stat.bank_statistics[&1].used_memory, 60);
        assert_eq!(stat.bank_statistics[&1].largest_allocation, 50);
        assert_eq!(stat.bank_statistics[&1].average_allocation_size, 30.0);
        assert_eq!(stat.detailed_stats.successful_allocations, 2);
        assert_eq!(stat.detailed_stats.failed_allocations, 1);
        assert_eq!(stat.detailed_stats.allocation_types["unknown"], 2);
        assert_eq!(stat.detailed_stats.allocation_types["LMEM_WEIGHT"], 1);
        assert_eq!(stat.detailed_stats.memory_fragmentation, 100.0 / 260.0 * 100.0);
    }

    #[test]
    fn test_empty_step() {
        let allocations = vec![alloc(0, 100, 3, 4)];
        let stat = calculate_step_statistics(&allocations, 0, "key", 4);

        assert_eq!(stat.total_memory, 0);
        assert_eq!(stat.used_memory, 0);
        assert_eq!(stat.free_memory, 0);
        assert_eq!(stat.usage_percentage, 0.0);
        assert_eq!(stat.peak_memory, 0);
        assert!(stat.bank_statistics.is_empty());
        assert_eq!(stat.detailed_stats.success_rate, 0.0);
    }

    #[test]
    fn test_free_memory_never_negative() {
        // Overlapping allocations use more bytes than their extent
        let allocations = vec![alloc(0, 100, 0, 0), alloc(0, 100, 0, 0)];
        let stat = calculate_step_statistics(&allocations, 0, "key", 0);
        assert_eq!(stat.total_memory, 100);
        assert_eq!(stat.used_memory, 200);
        assert_eq!(stat.free_memory, 0);
        // Overlap is trusted, so usage is not clamped
        assert_eq!(stat.usage_percentage, 200.0);
    }

    #[test]
    fn test_used_memory_saturates() {
        let big = 0x7000_0000_0000_0000;
        let allocations = vec![alloc(0, big, 0, 0), alloc(0, big, 0, 0), alloc(0, big, 0, 0)];
        let stat = calculate_step_statistics(&allocations, 0, "key", 0);

        assert_eq!(stat.used_memory, u64::MAX);
        assert_eq!(stat.total_memory, big);
        assert_eq!(stat.free_memory, 0);
        assert_eq!(stat.bank_statistics[&0].used_memory, u64::MAX);
    }
}
