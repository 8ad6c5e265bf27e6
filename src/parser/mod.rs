//! Trace parsing and data model definitions.
//!
//! This module handles:
//! - Splitting raw trace text into records and classifying them
//! - Decoding `key = value` fields into typed values
//! - Grouping and resolving allocation records
//! - Decoding scheduling records

pub mod fields;
pub mod lmem;
pub mod schema;
pub mod sections;
pub mod timestep;

// Re-export main types
pub use fields::{convert_value, decode_fields, FieldValue};
pub use lmem::{
    decode_allocation, group_by_settings, parse_lmem_sections, resolve_group, LmemParseOutput,
};
pub use schema::{
    AllocationGroup, ChipSpec, Configuration, GroupSettings, LmemAllocation, TimestepEntry,
    TimestepGroup,
};
pub use sections::{extract_valid_sections, split_profile_region, split_records, ValidSections};
pub use timestep::{parse_timestep_sections, TimestepParseOutput};
