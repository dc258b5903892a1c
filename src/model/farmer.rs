// src/model/farmer.rs
//! The farmer record and its display-field resolvers.
//!
//! Farmer payloads carry names and locations in several alternative field
//! layouts. The resolvers here apply a fixed priority order over those
//! layouts; the ordering is a contract — changing it changes visible output.

use crate::model::Field;
use crate::types::FarmerId;
use serde_json::Value;

/// Fallback shown when no name or location field resolves.
const UNKNOWN: &str = "Unknown";

/// A farmer as cached by the engine. Identity is the sole invariant key;
/// display name and location are best-effort derivations.
#[derive(Debug, Clone, PartialEq)]
pub struct Farmer {
    pub id: FarmerId,
    pub display_name: String,
    pub location: String,
    /// Field list embedded directly on the farmer payload, when present.
    /// Best-effort: an empty list here never overrides catalog data.
    pub embedded_fields: Vec<Field>,
}

/// Resolves a display name from a person record.
///
/// Priority order: explicit `name`; `firstName + lastName`; `firstName`;
/// `lastName`; the literal `"Unknown"`.
pub fn resolve_display_name(record: &Value) -> String {
    if let Some(name) = non_empty_str(record, "name") {
        return name;
    }
    let first = non_empty_str(record, "firstName");
    let last = non_empty_str(record, "lastName");
    match (first, last) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        (Some(first), None) => first,
        (None, Some(last)) => last,
        (None, None) => UNKNOWN.to_string(),
    }
}

/// Resolves a location descriptor from a person record.
///
/// Priority order: explicit `location`; `province + district`; `province`;
/// `district`; the literal `"Unknown"`.
pub fn resolve_location(record: &Value) -> String {
    if let Some(location) = non_empty_str(record, "location") {
        return location;
    }
    let province = non_empty_str(record, "province");
    let district = non_empty_str(record, "district");
    match (province, district) {
        (Some(province), Some(district)) => format!("{}, {}", province, district),
        (Some(province), None) => province,
        (None, Some(district)) => district,
        (None, None) => UNKNOWN.to_string(),
    }
}

/// Reads a string field, trimming it and treating blank as absent.
fn non_empty_str(record: &Value, key: &str) -> Option<String> {
    let raw = record.get(key)?.as_str()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
