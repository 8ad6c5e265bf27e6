//! Allocation record decoding, grouping and conflict resolution.
//!
//! Allocation records are decoded into typed [`LmemAllocation`]s, grouped
//! into maximal runs that share a [`Configuration`], and then resolved:
//! allocations that failed to place are packed back to back after the
//! highest successfully placed byte, and every allocation gets its bank id.

use super::fields::{convert_value, record_pairs, FieldMap, FieldValue};
use super::schema::{AllocationGroup, ChipSpec, Configuration, GroupSettings, LmemAllocation};
use crate::utils::config::{
    LMEM_FIELDS_WHITELIST, LMEM_REQUIRED_FIELDS, MAX_END_ADDRESS, TAG_ITERATION_RESULT,
};
use crate::utils::error::ParseError;
use log::{debug, warn};

/// A valid allocation record and the configuration it was recorded under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAllocation {
    pub allocation: LmemAllocation,
    pub configuration: Configuration,
}

/// A run of allocations sharing one configuration, not yet resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedGroup {
    pub configuration: Configuration,
    pub allocations: Vec<LmemAllocation>,
}

/// Result of parsing the allocation section
#[derive(Debug, Clone, Default)]
pub struct LmemParseOutput {
    /// Resolved groups in trace order
    pub groups: Vec<AllocationGroup>,

    /// Largest group `max_timestep` (never below 0); the engine's `ts_counts`
    pub max_timestep: i64,
}

/// Parse, group and resolve allocation records
///
/// **Public** - main entry point for the allocation section
///
/// # Arguments
/// * `sections` - Allocation records from the classifier, in trace order
/// * `chip` - Chip geometry; needed as soon as one valid record exists
///
/// # Errors
/// * `ParseError::MissingConfiguration` - valid records exist but
///   `lmem_bank_bytes` is unknown
pub fn parse_lmem_sections(
    sections: &[&str],
    chip: Option<&ChipSpec>,
) -> Result<LmemParseOutput, ParseError> {
    let decoded = sections.iter().filter_map(|record| decode_allocation(record));
    let pending = group_by_settings(decoded);

    if pending.is_empty() {
        debug!("No valid allocation records in {} sections", sections.len());
        return Ok(LmemParseOutput::default());
    }

    let chip = chip.ok_or_else(|| {
        ParseError::MissingConfiguration(
            "allocation records present but no chip-spec record found".to_string(),
        )
    })?;

    let mut groups = Vec::with_capacity(pending.len());
    let mut max_timestep: i64 = 0;
    for group in pending {
        let resolved = resolve_group(group, chip)?;
        max_timestep = max_timestep.max(resolved.max_timestep());
        groups.push(resolved);
    }

    debug!(
        "Resolved {} allocation groups, max timestep {}",
        groups.len(),
        max_timestep
    );

    Ok(LmemParseOutput {
        groups,
        max_timestep,
    })
}

/// Decode one allocation record
///
/// **Public** - returns None for malformed records, which are dropped
pub fn decode_allocation(record: &str) -> Option<DecodedAllocation> {
    let mut configuration = Configuration::default();
    let mut fields = FieldMap::new();

    for (key, raw) in record_pairs(record) {
        let value = convert_value(key, raw);
        match key {
            "shape_secs" => configuration.shape_secs = value.clone().into_int_list(),
            "allow_bank_conflict" => configuration.allow_bank_conflict = value.as_bool(),
            _ => {}
        }
        if LMEM_FIELDS_WHITELIST.contains(&key) {
            fields.insert(key.to_string(), value);
        }
    }

    match build_allocation(fields) {
        Some(allocation) => Some(DecodedAllocation {
            allocation,
            configuration,
        }),
        None => {
            debug!("Dropping malformed allocation record: {}", record.trim());
            None
        }
    }
}

/// Group decoded allocations into maximal runs of equal configuration
///
/// **Public** - order preserving; an equal configuration that comes back
/// after a different one starts a new group
pub fn group_by_settings(
    records: impl IntoIterator<Item = DecodedAllocation>,
) -> Vec<UnresolvedGroup> {
    let keyed = records
        .into_iter()
        .map(|decoded| (decoded.configuration, decoded.allocation));

    group_runs(keyed)
        .into_iter()
        .map(|(configuration, allocations)| UnresolvedGroup {
            configuration,
            allocations,
        })
        .collect()
}

/// Split a keyed sequence into maximal runs of equal keys
///
/// **Public** - shared by the allocation and scheduling parsers
pub fn group_runs<K: PartialEq, T>(
    items: impl IntoIterator<Item = (K, T)>,
) -> Vec<(K, Vec<T>)> {
    let mut runs: Vec<(K, Vec<T>)> = Vec::new();

    for (key, item) in items {
        if let Some((current, members)) = runs.last_mut() {
            if *current == key {
                members.push(item);
                continue;
            }
        }
        runs.push((key, vec![item]));
    }

    runs
}

/// Place failed allocations and derive per-allocation fields
///
/// **Public** - resolves one group independently of the others
///
/// Successful allocations keep their address. Failed ones are packed
/// contiguously from the highest successful end address, in trace order.
/// The merged list is successes first, then relocated failures. A failure
/// whose packed range would end past `MAX_END_ADDRESS` is dropped. Every
/// allocation gets `bank_id = addr / lmem_bank_bytes` and the group's
/// largest `timestep_end` as `max_timestep`.
///
/// # Errors
/// * `ParseError::MissingConfiguration` - `lmem_bank_bytes` absent or zero
pub fn resolve_group(
    group: UnresolvedGroup,
    chip: &ChipSpec,
) -> Result<AllocationGroup, ParseError> {
    let bank_bytes = chip.bank_bytes()?;

    let (success, failed): (Vec<LmemAllocation>, Vec<LmemAllocation>) = group
        .allocations
        .into_iter()
        .partition(LmemAllocation::is_success);

    let max_addr = success
        .iter()
        .map(LmemAllocation::end_addr)
        .max()
        .unwrap_or(0);

    let failed_count = failed.len();
    let mut cursor = max_addr;
    let mut relocated = Vec::with_capacity(failed_count);
    for mut alloc in failed {
        match cursor
            .checked_add(alloc.size)
            .filter(|&end| end <= MAX_END_ADDRESS)
        {
            Some(end) => {
                alloc.addr = cursor;
                cursor = end;
                relocated.push(alloc);
            }
            None => warn!(
                "Dropping failed allocation {}: {} bytes do not fit after 0x{:x}",
                alloc.op_name, alloc.size, cursor
            ),
        }
    }

    let mut allocations: Vec<LmemAllocation> = success.into_iter().chain(relocated).collect();

    let max_timestep = allocations
        .iter()
        .map(|alloc| alloc.timestep_end)
        .max()
        .unwrap_or(0);

    for alloc in &mut allocations {
        alloc.bank_id = alloc.addr / bank_bytes;
        alloc.max_timestep = max_timestep;
    }

    debug!(
        "Group {}: {} allocations, {} relocated from 0x{:x}",
        group.configuration.settings_key(),
        allocations.len(),
        failed_count,
        max_addr
    );

    Ok(AllocationGroup {
        settings: GroupSettings {
            configuration: group.configuration,
            chip: chip.clone(),
        },
        allocations,
    })
}

/// Build a typed allocation from whitelisted fields
///
/// **Private** - None when a required field is missing or ill-typed
fn build_allocation(mut fields: FieldMap) -> Option<LmemAllocation> {
    if !LMEM_REQUIRED_FIELDS
        .iter()
        .all(|field| fields.contains_key(*field))
    {
        return None;
    }

    let tag = fields.remove("tag")?.into_text();
    if tag != TAG_ITERATION_RESULT {
        return None;
    }

    let int_field = |fields: &FieldMap, key: &str| fields.get(key).and_then(FieldValue::as_int);

    let addr = u64::try_from(int_field(&fields, "addr")?).ok()?;
    let size = u64::try_from(int_field(&fields, "size")?)
        .ok()
        .filter(|&size| size > 0)?;
    addr.checked_add(size).filter(|&end| end <= MAX_END_ADDRESS)?;
    let timestep_start = int_field(&fields, "timestep_start")?;
    let timestep_end = int_field(&fields, "timestep_end")?;
    let hold_in_lmem = fields
        .get("hold_in_lmem")
        .and_then(FieldValue::as_bool)
        .unwrap_or(false);

    Some(LmemAllocation {
        op_name: fields.remove("op_name")?.into_text(),
        op_type: fields.remove("op_type").map(FieldValue::into_text),
        addr,
        size,
        timestep_start,
        timestep_end,
        lmem_type: fields.remove("lmem_type").map(FieldValue::into_text),
        hold_in_lmem,
        status: fields.remove("status")?.into_text(),
        tag,
        bank_id: 0,
        max_timestep: 0,
    })
}
