use lmem_trace_studio::parser::{
    convert_value, decode_allocation, decode_fields, extract_valid_sections, group_by_settings,
    parse_lmem_sections, parse_timestep_sections, split_profile_region, split_records, ChipSpec,
    FieldValue,
};
use lmem_trace_studio::ParseError;
use pretty_assertions::assert_eq;

fn allocation(op: &str, addr: &str, size: u64, status: &str, shape: &str) -> String {
    format!(
        "; action = lmem_assign; tag = iteration_result; op_name = {op}; addr = {addr}; size = {size}; \
         timestep_start = 0; timestep_end = 2; status = {status}; shape_secs = {shape}; allow_bank_conflict = true\n"
    )
}

#[test]
fn test_field_coercion_policy() {
    assert_eq!(convert_value("hold_in_lmem", "1"), FieldValue::Bool(true));
    assert_eq!(convert_value("one_loop", "TRUE"), FieldValue::Bool(true));
    assert_eq!(convert_value("allow_bank_conflict", "0"), FieldValue::Bool(false));
    assert_eq!(convert_value("allow_bank_conflict", "yes"), FieldValue::Bool(false));
    assert_eq!(convert_value("addr", "0x1f"), FieldValue::Int(31));
    assert_eq!(convert_value("timestep_end", "-3"), FieldValue::Int(-3));
    assert_eq!(convert_value("shape_secs", "4,1,,2"), FieldValue::IntList(vec![4, 1, 2]));
    assert_eq!(
        convert_value("op_name", "\"layer.0\""),
        FieldValue::Text("layer.0".to_string())
    );
    assert_eq!(
        convert_value("lmem_type", "  LMEM_WEIGHT "),
        FieldValue::Text("LMEM_WEIGHT".to_string())
    );
}

#[test]
fn test_decode_fields_keeps_all_keys() {
    let fields = decode_fields("; action = lmem_assign; custom = 0x10; note = \"hi\"");
    assert_eq!(fields.len(), 3);
    assert_eq!(fields["custom"], FieldValue::Int(16));
    assert_eq!(fields["note"], FieldValue::Text("hi".to_string()));
}

#[test]
fn test_grouping_scenario() {
    let records = [
        allocation("a", "0x0", 16, "success", "2,2"),
        allocation("b", "0x10", 16, "success", "2,2"),
        allocation("c", "0x0", 16, "success", "4,4"),
    ];
    let groups = group_by_settings(records.iter().filter_map(|r| decode_allocation(r)));

    let sizes: Vec<usize> = groups.iter().map(|g| g.allocations.len()).collect();
    assert_eq!(sizes, vec![2, 1]);
    assert_eq!(groups[0].configuration.shape_secs, Some(vec![2, 2]));
    assert_eq!(groups[0].configuration.allow_bank_conflict, Some(true));
}

#[test]
fn test_resolver_scenario() {
    let records = [
        allocation("ok", "0", 100, "success", "1"),
        allocation("bad", "150", 50, "fail", "1"),
    ];
    let sections: Vec<&str> = records.iter().map(String::as_str).collect();
    let chip = ChipSpec {
        lmem_bytes: Some(1024),
        lmem_banks: Some(16),
        lmem_bank_bytes: Some(64),
    };

    let output = parse_lmem_sections(&sections, Some(&chip)).unwrap();
    let allocs = &output.groups[0].allocations;

    assert_eq!((allocs[0].addr, allocs[0].bank_id), (0, 0));
    assert_eq!((allocs[1].addr, allocs[1].bank_id), (100, 1));
    assert_eq!(output.max_timestep, 2);
}

#[test]
fn test_relocated_addresses_are_contiguous() {
    let records = [
        allocation("s", "0x40", 64, "success", "1"),
        allocation("f1", "0", 24, "failed", "1"),
        allocation("f2", "0", 8, "failed", "1"),
        allocation("f3", "0", 40, "failed", "1"),
    ];
    let sections: Vec<&str> = records.iter().map(String::as_str).collect();
    let chip = ChipSpec {
        lmem_bank_bytes: Some(4096),
        ..Default::default()
    };

    let output = parse_lmem_sections(&sections, Some(&chip)).unwrap();
    let allocs = &output.groups[0].allocations;

    assert_eq!(allocs[0].addr, 0x40);
    assert_eq!(allocs[1].addr, 128);
    for pair in allocs[1..].windows(2) {
        assert_eq!(pair[1].addr, pair[0].addr + pair[0].size);
    }
}

#[test]
fn test_missing_bank_bytes_is_error() {
    let record = allocation("a", "0", 16, "success", "1");
    let chip = ChipSpec {
        lmem_bytes: Some(1024),
        ..Default::default()
    };

    let err = parse_lmem_sections(&[record.as_str()], Some(&chip)).unwrap_err();
    assert!(matches!(err, ParseError::MissingConfiguration(_)));

    // No valid records means no chip is needed
    let output = parse_lmem_sections(&["; action = lmem_assign; tag = iteration_result"], None).unwrap();
    assert!(output.groups.is_empty());
}

#[test]
fn test_classifier_views() {
    let trace = format!(
        "compiler banner\n\
         ; action = lmem_assign; step = lmem_spec; lmem_bytes = 1024; lmem_banks = 16; lmem_bank_bytes = 0x40\n\
         {}\
         ; action = timestep_cycle; step = timestep_cycle; tag = result; timestep = 9\n\
         ; action = timestep_cycle; debug_range = given\n\
         ; action = timestep_cycle; step = timestep_cycle; tag = result; timestep = 0\n\
         ; action = timestep_cycle; step = timestep_cycle; tag = result; timestep = 0\n",
        allocation("a", "0", 16, "success", "1")
    );

    assert_eq!(split_records(&trace).len(), 6);

    let sections = extract_valid_sections(&trace);
    let chip = sections.chip.unwrap();
    assert_eq!(chip.lmem_bytes, Some(1024));
    // hex is not a valid chip-spec value
    assert_eq!(chip.lmem_bank_bytes, None);
    assert_eq!(sections.lmem_sections.len(), 1);
    assert_eq!(sections.timestep_sections.len(), 1);
}

#[test]
fn test_profile_split_first_match() {
    let log = "compute\n---\nnot it\n=======\n  START_TIME 0\n---\nstart_time again\n";
    let (compute, profile) = split_profile_region(log);

    assert_eq!(compute, "compute\n---\nnot it\n");
    assert!(profile.unwrap().starts_with("======="));

    let (all, none) = split_profile_region("no divider here\n");
    assert_eq!(all, "no divider here\n");
    assert!(none.is_none());
}

#[test]
fn test_timestep_parser_groups() {
    let records = [
        "; action = timestep_cycle; step = timestep_cycle; tag = result; timestep = 4; timestep_type = gdma; op = load; cycle = 7",
        "; action = timestep_cycle; step = timestep_cycle; tag = result; timestep = 5; timestep_type = bdc; op = conv",
    ];
    let output = parse_timestep_sections(&records);

    assert_eq!(output.groups.len(), 1);
    assert_eq!(output.groups[0].entries.len(), 1);
    assert_eq!(output.groups[0].entries[0].cycle_end, 7);
    assert_eq!(output.groups[0].entries[0].timestep, 4);
}
