//! Scheduling record parsing for the `timestep_cycle` section.
//!
//! Scheduling records are decoded into flat [`TimestepEntry`] lists grouped
//! by `shape_secs`. They are reported as-is; no statistics are derived.

use super::fields::{convert_value, record_pairs, FieldMap, FieldValue};
use super::lmem::group_runs;
use super::schema::{TimestepEntry, TimestepGroup, TimestepSettings};
use crate::utils::config::{TIMESTEP_FIELDS_WHITELIST, TIMESTEP_REQUIRED_FIELDS};
use log::debug;

/// Result of parsing the scheduling section
#[derive(Debug, Clone, Default)]
pub struct TimestepParseOutput {
    pub groups: Vec<TimestepGroup>,
}

/// Parse and group scheduling records
///
/// **Public** - main entry point for the scheduling section
pub fn parse_timestep_sections(sections: &[&str]) -> TimestepParseOutput {
    let entries: Vec<(TimestepSettings, TimestepEntry)> = sections
        .iter()
        .filter_map(|record| decode_timestep_entry(record))
        .collect();

    let groups: Vec<TimestepGroup> = group_runs(entries)
        .into_iter()
        .map(|(settings, entries)| TimestepGroup { settings, entries })
        .collect();

    debug!(
        "Parsed {} scheduling groups from {} sections",
        groups.len(),
        sections.len()
    );

    TimestepParseOutput { groups }
}

/// Decode one scheduling record
///
/// **Public** - returns None when `timestep`, `timestep_type`, `op` or an
/// integer `cycle` is missing
pub fn decode_timestep_entry(record: &str) -> Option<(TimestepSettings, TimestepEntry)> {
    let mut fields = FieldMap::new();
    for (key, raw) in record_pairs(record) {
        if TIMESTEP_FIELDS_WHITELIST.contains(&key) {
            fields.insert(key.to_string(), convert_value(key, raw));
        }
    }

    if !TIMESTEP_REQUIRED_FIELDS
        .iter()
        .all(|field| fields.contains_key(*field))
    {
        debug!("Dropping incomplete scheduling record: {}", record.trim());
        return None;
    }

    let timestep = fields.get("timestep").and_then(FieldValue::as_int)?;
    let cycle = fields.get("cycle").and_then(FieldValue::as_int)?;
    let shape_secs = fields.remove("shape_secs").and_then(FieldValue::into_int_list);
    let text = |fields: &mut FieldMap, key: &str| fields.remove(key).map(FieldValue::into_text);

    let entry = TimestepEntry {
        timestep,
        timestep_type: text(&mut fields, "timestep_type")?,
        op: text(&mut fields, "op")?,
        tensor_name: text(&mut fields, "tensor_name"),
        concerning_op: text(&mut fields, "concerning_op"),
        concerning_op_name: text(&mut fields, "concerning_op_name"),
        cycle,
        shape_secs: shape_secs.clone(),
        cycle_start: 0,
        cycle_end: cycle,
    };

    Some((TimestepSettings { shape_secs }, entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "; action = timestep_cycle; step = timestep_cycle; tag = result";

    #[test]
    fn test_decode_timestep_entry() {
        let record = format!(
            "{BASE}; timestep = 3; timestep_type = layer; op = \"conv_1\"; tensor_name = t0; cycle = 1200; shape_secs = 1,2"
        );
        let (settings, entry) = decode_timestep_entry(&record).unwrap();

        assert_eq!(settings.shape_secs, Some(vec![1, 2]));
        assert_eq!(entry.timestep, 3);
        assert_eq!(entry.timestep_type, "layer");
        assert_eq!(entry.op, "conv_1");
        assert_eq!(entry.tensor_name.as_deref(), Some("t0"));
        assert_eq!(entry.cycle_start, 0);
        assert_eq!(entry.cycle_end, 1200);
    }

    #[test]
    fn test_decode_timestep_entry_requires_cycle() {
        let record = format!("{BASE}; timestep = 3; timestep_type = layer; op = conv");
        assert!(decode_timestep_entry(&record).is_none());

        let record = format!("{BASE}; timestep = 3; timestep_type = layer; op = conv; cycle = many");
        assert!(decode_timestep_entry(&record).is_none());
    }

    #[test]
    fn test_parse_timestep_sections_groups_by_shape() {
        let records: Vec<String> = [(0, "1,1"), (1, "1,1"), (2, "2,1")]
            .iter()
            .map(|(ts, shape)| {
                format!("{BASE}; timestep = {ts}; timestep_type = gdma; op = load; cycle = 10; shape_secs = {shape}")
            })
            .collect();
        let sections: Vec<&str> = records.iter().map(String::as_str).collect();

        let output = parse_timestep_sections(&sections);
        assert_eq!(output.groups.len(), 2);
        assert_eq!(output.groups[0].entries.len(), 2);
        assert_eq!(output.groups[1].settings.shape_secs, Some(vec![2, 1]));
    }

    #[test]
    fn test_empty_sections() {
        let output = parse_timestep_sections(&[]);
        assert!(output.groups.is_empty());
    }
}
