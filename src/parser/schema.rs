//! Data model for decoded trace records.
//!
//! These types are what the parsers produce and what the statistics
//! engine consumes. All of them serialize into the output document.

use crate::utils::error::ParseError;
use serde::{Deserialize, Serialize};

/// Local-memory geometry from the chip-spec record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lmem_bytes: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lmem_banks: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lmem_bank_bytes: Option<u64>,
}

impl ChipSpec {
    /// Bytes per bank, required to derive `bank_id`
    ///
    /// # Errors
    /// * `ParseError::MissingConfiguration` - field absent or zero
    pub fn bank_bytes(&self) -> Result<u64, ParseError> {
        match self.lmem_bank_bytes {
            Some(0) => Err(ParseError::MissingConfiguration(
                "lmem_bank_bytes is zero".to_string(),
            )),
            Some(bytes) => Ok(bytes),
            None => Err(ParseError::MissingConfiguration(
                "lmem_bank_bytes is not present in the chip spec".to_string(),
            )),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lmem_bytes.is_none() && self.lmem_banks.is_none() && self.lmem_bank_bytes.is_none()
    }
}

/// Grouping key for a run of allocation records
///
/// A key missing from a record is `None` and only equals another `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_secs: Option<Vec<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_bank_conflict: Option<bool>,
}

impl Configuration {
    /// Stable textual key used to look up a group's statistics
    pub fn settings_key(&self) -> String {
        #[derive(Serialize)]
        struct Key<'a> {
            allow_bank_conflict: Option<bool>,
            shape_secs: Option<&'a [i64]>,
        }

        let key = Key {
            allow_bank_conflict: self.allow_bank_conflict,
            shape_secs: self.shape_secs.as_deref(),
        };
        // Serializing plain options and integers cannot fail
        serde_json::to_string(&key).unwrap_or_default()
    }
}

/// Settings attached to an allocation group: its configuration plus chip geometry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    #[serde(flatten)]
    pub configuration: Configuration,

    #[serde(flatten)]
    pub chip: ChipSpec,
}

impl From<Configuration> for GroupSettings {
    fn from(configuration: Configuration) -> Self {
        Self {
            configuration,
            chip: ChipSpec::default(),
        }
    }
}

/// One local-memory allocation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LmemAllocation {
    pub op_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_type: Option<String>,

    /// Byte offset. After resolution, failed allocations carry their packed address.
    pub addr: u64,

    pub size: u64,

    pub timestep_start: i64,

    /// Inclusive. `timestep_end < timestep_start` marks a wraparound lifetime.
    pub timestep_end: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lmem_type: Option<String>,

    #[serde(default)]
    pub hold_in_lmem: bool,

    pub status: String,

    pub tag: String,

    /// `addr / lmem_bank_bytes`, set by the resolver
    #[serde(default)]
    pub bank_id: u64,

    /// Largest `timestep_end` in the allocation's group, set by the resolver
    #[serde(default)]
    pub max_timestep: i64,
}

impl LmemAllocation {
    pub fn is_success(&self) -> bool {
        self.status == crate::utils::config::STATUS_SUCCESS
    }

    /// One past the last byte occupied
    pub fn end_addr(&self) -> u64 {
        self.addr.saturating_add(self.size)
    }
}

/// A configuration and its resolved allocations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationGroup {
    pub settings: GroupSettings,
    pub allocations: Vec<LmemAllocation>,
}

impl AllocationGroup {
    /// Last timestep covered by this group (0 when empty)
    pub fn max_timestep(&self) -> i64 {
        self.allocations
            .iter()
            .map(|alloc| alloc.max_timestep)
            .max()
            .unwrap_or(0)
    }
}

/// Settings of a scheduling group (only `shape_secs` matters there)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestepSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_secs: Option<Vec<i64>>,
}

/// One scheduling record from the `timestep_cycle` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestepEntry {
    pub timestep: i64,
    pub timestep_type: String,
    pub op: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tensor_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concerning_op: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concerning_op_name: Option<String>,

    pub cycle: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_secs: Option<Vec<i64>>,

    #[serde(rename = "_cycStart")]
    pub cycle_start: i64,

    #[serde(rename = "_cycEnd")]
    pub cycle_end: i64,
}

/// A run of scheduling entries sharing `shape_secs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestepGroup {
    pub settings: TimestepSettings,
    pub entries: Vec<TimestepEntry>,
}
