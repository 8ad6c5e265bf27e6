//! Field decoding for `; key = value` trace records.
//!
//! A record is a run of `;`-delimited assignments. Keys are identifier
//! characters, values are everything up to the next `;`, trimmed.
//! Values are coerced into a [`FieldValue`] by a fixed policy so that
//! downstream parsers never look at raw text again.

use crate::utils::config::BOOLEAN_FIELDS;
use std::collections::HashMap;

/// A decoded field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    IntList(Vec<i64>),
    Text(String),
}

impl FieldValue {
    /// Integer view of the value, if it decoded as one
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean view of the value, if it decoded as one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer-sequence view. A lone integer is a one-element sequence.
    pub fn into_int_list(self) -> Option<Vec<i64>> {
        match self {
            Self::IntList(list) => Some(list),
            Self::Int(n) => Some(vec![n]),
            _ => None,
        }
    }

    /// Text view. Numbers and booleans are rendered back to their decimal form.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Int(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::IntList(list) => list
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Decoded fields of one record, keyed by field name.
///
/// A key repeated inside one record keeps its last value.
pub type FieldMap = HashMap<String, FieldValue>;

/// Iterate the raw `(key, value)` pairs of a record, in order.
///
/// Text before the first `;` is never a field. Segments that are not a
/// `key = value` assignment are skipped.
pub fn record_pairs(record: &str) -> impl Iterator<Item = (&str, &str)> {
    record.split(';').skip(1).filter_map(split_pair)
}

/// Decode every field of a record
pub fn decode_fields(record: &str) -> FieldMap {
    record_pairs(record)
        .map(|(key, raw)| (key.to_string(), convert_value(key, raw)))
        .collect()
}

/// Coerce a raw value according to its key
///
/// Policy, first match wins:
/// 1. boolean keys: `true` iff `"1"` or case-insensitive `"true"`
/// 2. `0x` prefix: base-16 integer
/// 3. plain integer literal with optional leading `-`: base-10 integer
/// 4. `shape_secs`: comma separated base-10 integers, empty pieces skipped
/// 5. double-quoted: the string without quotes
/// 6. anything else: the trimmed string
pub fn convert_value(key: &str, raw: &str) -> FieldValue {
    let value = raw.trim();

    if BOOLEAN_FIELDS.contains(&key) {
        return FieldValue::Bool(value == "1" || value.eq_ignore_ascii_case("true"));
    }

    if let Some(hex) = value.strip_prefix("0x") {
        if let Ok(n) = i64::from_str_radix(hex, 16) {
            return FieldValue::Int(n);
        }
    }

    if is_integer_literal(value) {
        if let Ok(n) = value.parse::<i64>() {
            return FieldValue::Int(n);
        }
    }

    if key == "shape_secs" {
        if let Some(list) = parse_int_list(value) {
            return FieldValue::IntList(list);
        }
    }

    if let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        return FieldValue::Text(inner.to_string());
    }

    FieldValue::Text(value.to_string())
}

/// Split one `;`-segment into a key and a trimmed value
///
/// **Private** - internal helper for record_pairs
fn split_pair(segment: &str) -> Option<(&str, &str)> {
    let rest = segment.trim_start();
    let key_len = rest
        .find(|c: char| !is_key_char(c))
        .unwrap_or(rest.len());
    if key_len == 0 {
        return None;
    }

    let (key, rest) = rest.split_at(key_len);
    let value = rest.trim_start().strip_prefix('=')?;
    if value.is_empty() {
        return None;
    }

    Some((key, value.trim()))
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_integer_literal(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_int_list(value: &str) -> Option<Vec<i64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| piece.parse::<i64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_pairs_skips_prefix_and_junk() {
        let record = "prefix text; action = lmem_assign; not a pair; addr = 0x10 ;size=4";
        let pairs: Vec<_> = record_pairs(record).collect();
        assert_eq!(
            pairs,
            vec![("action", "lmem_assign"), ("addr", "0x10"), ("size", "4")]
        );
    }

    #[test]
    fn test_record_pairs_value_spans_to_next_semicolon() {
        let record = "; op_name = conv 1 \n; tag = iteration_result\n";
        let pairs: Vec<_> = record_pairs(record).collect();
        assert_eq!(pairs[0], ("op_name", "conv 1"));
        assert_eq!(pairs[1], ("tag", "iteration_result"));
    }

    #[test]
    fn test_decode_fields_last_value_wins() {
        let fields = decode_fields("; step = lmem_spec; size = 8; step = other");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["step"], FieldValue::Text("other".to_string()));
        assert_eq!(fields["size"], FieldValue::Int(8));
    }

    #[test]
    fn test_boolean_fields() {
        assert_eq!(convert_value("hold_in_lmem", "1"), FieldValue::Bool(true));
        assert_eq!(convert_value("allow_bank_conflict", "TRUE"), FieldValue::Bool(true));
        assert_eq!(convert_value("one_loop", "0"), FieldValue::Bool(false));
        assert_eq!(convert_value("hold_in_lmem", "yes"), FieldValue::Bool(false));
    }

    #[test]
    fn test_numeric_fields() {
        assert_eq!(convert_value("addr", "0x1000"), FieldValue::Int(4096));
        assert_eq!(convert_value("size", "1024"), FieldValue::Int(1024));
        assert_eq!(convert_value("timestep_end", "-3"), FieldValue::Int(-3));
        assert_eq!(convert_value("size", "+5"), FieldValue::Text("+5".to_string()));
    }

    #[test]
    fn test_shape_secs_list() {
        assert_eq!(
            convert_value("shape_secs", "2,2,1,"),
            FieldValue::IntList(vec![2, 2, 1])
        );
        // A single value is still an integer at decode time
        assert_eq!(convert_value("shape_secs", "4"), FieldValue::Int(4));
        assert_eq!(
            convert_value("shape_secs", "a,b"),
            FieldValue::Text("a,b".to_string())
        );
    }

    #[test]
    fn test_quoted_and_raw_strings() {
        assert_eq!(
            convert_value("op_name", "\"conv_1\""),
            FieldValue::Text("conv_1".to_string())
        );
        assert_eq!(
            convert_value("status", " failed "),
            FieldValue::Text("failed".to_string())
        );
    }

    #[test]
    fn test_into_views() {
        assert_eq!(FieldValue::Int(4).into_int_list(), Some(vec![4]));
        assert_eq!(FieldValue::Int(12).into_text(), "12");
        assert_eq!(FieldValue::Text("x".to_string()).as_int(), None);
        assert_eq!(FieldValue::Bool(true).as_bool(), Some(true));
    }
}
