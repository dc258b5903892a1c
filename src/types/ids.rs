// src/types/ids.rs
//! Canonical identifiers and the normalization rules that produce them.
//!
//! Backend payloads express ownership in several shapes: a raw string id, a
//! nested object carrying `_id`/`id`, or a wrapper object containing the
//! owner one level deeper. All of those are resolved **once**, at ingestion,
//! into the phantom-typed ids defined here; downstream code never re-parses
//! raw shapes.

use crate::constants::{ID_HEURISTIC_MIN_LEN, ID_HEURISTIC_SUFFIX_LEN};
use crate::types::ValidationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// Strong typing for identifiers with phantom markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Id<T> {
    value: String,
    _phantom: PhantomData<T>,
}

/// Marker types for the two identifier kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FarmerMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldMarker;

pub type FarmerId = Id<FarmerMarker>;
pub type FieldId = Id<FieldMarker>;

lazy_static::lazy_static! {
    /// Ids minted client-side before the backend has assigned a real one.
    ///
    /// These must never be sent back to the backend as record identifiers.
    static ref PLACEHOLDER_ID: Regex =
        Regex::new(r"(?i)^(?:temp|tmp|local|draft|new|offline)[-_]")
            .expect("placeholder id pattern is a constant and must compile");
}

impl<T> Id<T> {
    /// Creates an id from a raw backend value, rejecting empty strings.
    pub fn from_raw(input: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidId("empty identifier".to_string()));
        }
        Ok(Self {
            value: trimmed.to_string(),
            _phantom: PhantomData,
        })
    }

    /// Returns the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Whether this id is a client-side placeholder rather than a backend
    /// identity. Placeholder ids must not reach mutation endpoints.
    pub fn is_placeholder(&self) -> bool {
        PLACEHOLDER_ID.is_match(&self.value)
            || self.value.eq_ignore_ascii_case("undefined")
            || self.value.eq_ignore_ascii_case("null")
    }

    /// Compares this id against a raw string, exact first, suffix second.
    pub fn matches(&self, other: &str) -> IdMatch {
        ids_match(&self.value, other)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Id::from_raw(value).map_err(serde::de::Error::custom)
    }
}

/// Outcome of an identifier comparison.
///
/// A `Suffix` result is a heuristic, not a guarantee — callers that act on
/// it should treat the pairing with lower confidence than `Exact`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdMatch {
    /// The two ids are byte-identical.
    Exact,
    /// The ids differ but share the same trailing characters; both were long
    /// enough for the heuristic to apply.
    Suffix,
    /// The ids do not match under either rule.
    None,
}

impl IdMatch {
    /// Whether the comparison found any match, exact or heuristic.
    pub fn is_match(&self) -> bool {
        !matches!(self, IdMatch::None)
    }
}

/// Compares two raw identifiers: exact equality first, then the trailing
/// suffix heuristic for ids long enough to carry one.
///
/// The suffix rule exists because the backend has been seen emitting the
/// same record under truncated and full encodings of one id. Every suffix
/// match is logged so the lower-confidence pairing stays visible.
pub fn ids_match(a: &str, b: &str) -> IdMatch {
    if a == b {
        return IdMatch::Exact;
    }
    if a.chars().count() < ID_HEURISTIC_MIN_LEN || b.chars().count() < ID_HEURISTIC_MIN_LEN {
        return IdMatch::None;
    }
    let suffix_of = |s: &str| -> String {
        let chars: Vec<char> = s.chars().collect();
        let start = chars.len().saturating_sub(ID_HEURISTIC_SUFFIX_LEN);
        chars[start..].iter().collect()
    };
    if suffix_of(a) == suffix_of(b) {
        log::warn!(
            "heuristic id match: '{}' ~ '{}' (shared trailing {} chars)",
            a,
            b,
            ID_HEURISTIC_SUFFIX_LEN
        );
        return IdMatch::Suffix;
    }
    IdMatch::None
}

/// Extracts a canonical identifier from a heterogeneously-shaped record.
///
/// Each candidate is a dot-separated path into the record. The node it
/// reaches may be the id itself (string or number) or an object carrying
/// `_id`/`id`; nested-of-nested shapes are expressed as deeper paths. The
/// first non-empty hit wins, coerced to a string.
pub fn extract_id(record: &Value, candidates: &[&str]) -> Option<String> {
    for path in candidates {
        let Some(node) = walk_path(record, path) else {
            continue;
        };
        if let Some(id) = coerce_id(node) {
            return Some(id);
        }
        if let Some(obj) = node.as_object() {
            for key in ["_id", "id"] {
                if let Some(id) = obj.get(key).and_then(coerce_id) {
                    return Some(id);
                }
            }
        }
    }
    None
}

/// Follows a dot-separated path into a JSON value.
fn walk_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Coerces a JSON scalar to a non-empty id string.
fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
