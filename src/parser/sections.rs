//! Record splitting and classification for raw trace text.
//!
//! The trace is a flat stream of `; action = <name>; key = value; ...`
//! records. This module cuts it into records and picks out:
//! - the chip-spec record (first `lmem_assign` / `lmem_spec`)
//! - allocation records (`lmem_assign` / `iteration_result`)
//! - scheduling records (`timestep_cycle` results after the `given` marker)

use super::fields::record_pairs;
use super::schema::ChipSpec;
use crate::utils::config::{
    ACTION_KEY, ACTION_LMEM_ASSIGN, ACTION_TIMESTEP_CYCLE, CHIP_FIELDS, DEBUG_RANGE_GIVEN,
    PROFILE_DIVIDER_CHARS, PROFILE_DIVIDER_MIN_LEN, PROFILE_START_MARKER, STEP_LMEM_SPEC,
    STEP_TIMESTEP_CYCLE, TAG_ITERATION_RESULT, TAG_RESULT,
};
use log::debug;
use std::collections::HashSet;

/// Record views extracted from the compute region of a trace
#[derive(Debug, Clone, Default)]
pub struct ValidSections<'a> {
    /// Chip geometry, absent when no chip-spec record carries any field
    pub chip: Option<ChipSpec>,

    /// Allocation records in trace order
    pub lmem_sections: Vec<&'a str>,

    /// Scheduling records in trace order, byte-identical duplicates removed
    pub timestep_sections: Vec<&'a str>,
}

impl ValidSections<'_> {
    pub fn is_empty(&self) -> bool {
        self.lmem_sections.is_empty() && self.timestep_sections.is_empty()
    }
}

/// Marker fields that decide which view a record belongs to
#[derive(Debug, Default)]
struct RecordMarkers<'a> {
    action: Option<&'a str>,
    step: Option<&'a str>,
    tag: Option<&'a str>,
    debug_range: Option<&'a str>,
}

impl<'a> RecordMarkers<'a> {
    fn read(record: &'a str) -> Self {
        let mut markers = Self::default();
        for (key, value) in record_pairs(record) {
            let slot = match key {
                ACTION_KEY => &mut markers.action,
                "step" => &mut markers.step,
                "tag" => &mut markers.tag,
                "debug_range" => &mut markers.debug_range,
                _ => continue,
            };
            // First occurrence wins
            slot.get_or_insert(value);
        }
        markers
    }

    fn is_chip_spec(&self) -> bool {
        self.action == Some(ACTION_LMEM_ASSIGN) && self.step == Some(STEP_LMEM_SPEC)
    }

    fn is_allocation(&self) -> bool {
        self.action == Some(ACTION_LMEM_ASSIGN) && self.tag == Some(TAG_ITERATION_RESULT)
    }

    fn is_timestep_start(&self) -> bool {
        self.action == Some(ACTION_TIMESTEP_CYCLE) && self.debug_range == Some(DEBUG_RANGE_GIVEN)
    }

    fn is_timestep_result(&self) -> bool {
        self.action == Some(ACTION_TIMESTEP_CYCLE)
            && self.step == Some(STEP_TIMESTEP_CYCLE)
            && self.tag == Some(TAG_RESULT)
    }
}

/// Split off a trailing profile region
///
/// **Public** - preprocessing step before classification
///
/// The profile region starts at the first divider line (three or more `=`
/// or `-`) whose next line mentions the start-time marker. Returns the
/// compute region and, if found, the profile region (divider included).
pub fn split_profile_region(raw_log: &str) -> (&str, Option<&str>) {
    let mut offset = 0;
    let mut lines = raw_log.split_inclusive('\n').peekable();

    while let Some(line) = lines.next() {
        if is_divider(line) {
            if let Some(next) = lines.peek() {
                if next.to_ascii_lowercase().contains(PROFILE_START_MARKER) {
                    debug!("Profile region starts at byte {}", offset);
                    return (&raw_log[..offset], Some(&raw_log[offset..]));
                }
            }
        }
        offset += line.len();
    }

    (raw_log, None)
}

/// Split trace text into records at every `; action = <identifier>` marker
///
/// **Public** - text before the first marker is not a record and is dropped
pub fn split_records(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = text
        .match_indices(';')
        .map(|(idx, _)| idx)
        .filter(|&idx| is_record_start(&text[idx + 1..]))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .collect()
}

/// Classify the records of a compute region
///
/// **Public** - main entry point for the classifier
///
/// Finding nothing is not an error: the returned collections are empty and
/// the caller decides what that means.
pub fn extract_valid_sections(text: &str) -> ValidSections<'_> {
    let records = split_records(text);
    let markers: Vec<RecordMarkers> = records.iter().map(|r| RecordMarkers::read(r)).collect();

    debug!("Split trace into {} records", records.len());

    let chip = records
        .iter()
        .zip(&markers)
        .find(|(_, m)| m.is_chip_spec())
        .and_then(|(record, _)| parse_chip_spec(record));

    let lmem_sections: Vec<&str> = records
        .iter()
        .zip(&markers)
        .filter(|(_, m)| m.is_allocation())
        .map(|(record, _)| *record)
        .collect();

    let timestep_sections = match markers.iter().position(RecordMarkers::is_timestep_start) {
        Some(start) => dedup_exact(
            records[start..]
                .iter()
                .zip(&markers[start..])
                .filter(|(_, m)| m.is_timestep_result())
                .map(|(record, _)| *record),
        ),
        None => Vec::new(),
    };

    debug!(
        "Classified {} allocation records, {} scheduling records, chip spec {}",
        lmem_sections.len(),
        timestep_sections.len(),
        if chip.is_some() { "found" } else { "absent" }
    );

    ValidSections {
        chip,
        lmem_sections,
        timestep_sections,
    }
}

/// Decode the chip-spec fields as decimal integers
///
/// **Private** - fields that are not decimal are left out
fn parse_chip_spec(record: &str) -> Option<ChipSpec> {
    let mut chip = ChipSpec::default();

    for (key, value) in record_pairs(record) {
        if !CHIP_FIELDS.contains(&key) {
            continue;
        }
        let Ok(parsed) = value.parse::<u64>() else {
            debug!("Ignoring non-decimal chip field {} = {}", key, value);
            continue;
        };
        match key {
            "lmem_bytes" => chip.lmem_bytes = Some(parsed),
            "lmem_banks" => chip.lmem_banks = Some(parsed),
            "lmem_bank_bytes" => chip.lmem_bank_bytes = Some(parsed),
            _ => {}
        }
    }

    (!chip.is_empty()).then_some(chip)
}

/// Keep the first occurrence of each byte-identical record.
///
/// Distinct records that format to the same text collapse into one.
fn dedup_exact<'a>(records: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    records.filter(|record| seen.insert(*record)).collect()
}

fn is_record_start(after_semicolon: &str) -> bool {
    let Some(rest) = after_semicolon.trim_start().strip_prefix(ACTION_KEY) else {
        return false;
    };
    let Some(value) = rest.trim_start().strip_prefix('=') else {
        return false;
    };
    value
        .trim_start()
        .starts_with(|c: char| c.is_alphanumeric() || c == '_')
}

fn is_divider(line: &str) -> bool {
    let trimmed = line.trim();
    let Some(first) = trimmed.chars().next() else {
        return false;
    };
    PROFILE_DIVIDER_CHARS.contains(&first)
        && trimmed.len() >= PROFILE_DIVIDER_MIN_LEN
        && trimmed.chars().all(|c| c == first)
}
