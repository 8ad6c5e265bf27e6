//! Configuration and constants for trace parsing.

/// Current output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Suffix appended to the log file stem when no output path is given
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_parsed.json";

// Record markers. Every record starts with `; action = <identifier>`.
pub const ACTION_KEY: &str = "action";
pub const ACTION_LMEM_ASSIGN: &str = "lmem_assign";
pub const ACTION_TIMESTEP_CYCLE: &str = "timestep_cycle";
pub const STEP_LMEM_SPEC: &str = "lmem_spec";
pub const STEP_TIMESTEP_CYCLE: &str = "timestep_cycle";
pub const TAG_ITERATION_RESULT: &str = "iteration_result";
pub const TAG_RESULT: &str = "result";
pub const DEBUG_RANGE_GIVEN: &str = "given";

/// Status value of an allocation that was placed by the allocator
pub const STATUS_SUCCESS: &str = "success";

/// Highest end address (`addr + size`) an allocation may reach
pub const MAX_END_ADDRESS: u64 = i64::MAX as u64;

/// `lmem_type` bucket for allocations without a label
pub const UNKNOWN_LMEM_TYPE: &str = "unknown";

/// Keys whose values are coerced to booleans
pub const BOOLEAN_FIELDS: &[&str] = &["hold_in_lmem", "allow_bank_conflict", "one_loop"];

/// Keys read from the chip-spec record
pub const CHIP_FIELDS: &[&str] = &["lmem_bytes", "lmem_banks", "lmem_bank_bytes"];

/// Keys kept on a decoded allocation record
pub const LMEM_FIELDS_WHITELIST: &[&str] = &[
    "op_name",
    "op_type",
    "addr",
    "size",
    "timestep_start",
    "timestep_end",
    "lmem_type",
    "hold_in_lmem",
    "status",
    "tag",
];

/// Keys an allocation record must carry to be valid
pub const LMEM_REQUIRED_FIELDS: &[&str] = &[
    "op_name",
    "addr",
    "size",
    "timestep_start",
    "timestep_end",
    "status",
    "tag",
];

/// Keys kept on a decoded scheduling record
pub const TIMESTEP_FIELDS_WHITELIST: &[&str] = &[
    "timestep",
    "timestep_type",
    "op",
    "tensor_name",
    "concerning_op",
    "concerning_op_name",
    "cycle",
    "shape_secs",
];

/// Keys a scheduling record must carry to be valid
pub const TIMESTEP_REQUIRED_FIELDS: &[&str] = &["timestep", "timestep_type", "op", "cycle"];

// Profile region detection: a divider line followed by a start-time line
pub const PROFILE_START_MARKER: &str = "start_time";
pub const PROFILE_DIVIDER_CHARS: &[char] = &['=', '-'];
pub const PROFILE_DIVIDER_MIN_LEN: usize = 3;
