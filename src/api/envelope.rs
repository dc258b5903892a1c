// src/api/envelope.rs
//! Envelope unwrapping for unreliable backend responses.
//!
//! The backend wraps (or doesn't wrap) its payloads in several envelope
//! shapes depending on endpoint and, apparently, deployment vintage. The
//! helpers here check the known shapes in a fixed order; the order is a
//! contract and is test-covered.

use serde_json::Value;

/// Envelope keys probed, in order, when a response's data object hides its
/// item list under a nonstandard key.
pub const ALTERNATE_ITEM_KEYS: [&str; 4] = ["farms", "results", "content", "data"];

/// Extracts the item list from a catalog response, trying each known
/// envelope shape in order:
///
/// 1. `{ success: true, data: { items: [...] } }`
/// 2. a bare array
/// 3. `{ data: [...] }`
/// 4. `{ items: [...] }`
/// 5. `{ results: [...] }`
/// 6. `{ farms: [...] }`
///
/// Returns `None` when no shape matches; an empty array under a matching
/// shape returns `Some(vec![])` — "matched but empty" and "unrecognized"
/// are different signals to the strategy ladder.
pub fn unwrap_item_list(body: &Value) -> Option<Vec<Value>> {
    if body.get("success").and_then(Value::as_bool) == Some(true) {
        if let Some(items) = body
            .get("data")
            .and_then(|data| data.get("items"))
            .and_then(Value::as_array)
        {
            return Some(items.clone());
        }
    }
    if let Some(items) = body.as_array() {
        return Some(items.clone());
    }
    for key in ["data", "items", "results", "farms"] {
        if let Some(items) = body.get(key).and_then(Value::as_array) {
            return Some(items.clone());
        }
    }
    None
}

/// Reads the server-reported total item count, wherever it lives.
pub fn reported_total(body: &Value) -> Option<u64> {
    for node in [body.get("data").unwrap_or(&Value::Null), body] {
        for key in ["totalItems", "total", "totalCount"] {
            if let Some(total) = node.get(key).and_then(Value::as_u64) {
                return Some(total);
            }
        }
    }
    None
}

/// Reads the server-reported page count, wherever it lives.
pub fn reported_total_pages(body: &Value) -> Option<u64> {
    for node in [body.get("data").unwrap_or(&Value::Null), body] {
        if let Some(pages) = node.get("totalPages").and_then(Value::as_u64) {
            return Some(pages);
        }
    }
    None
}

/// Probes alternate envelope keys inside a response's data object.
///
/// Last rung of the strategy ladder: given the most recent response body,
/// looks inside its `data` object (or the body itself when there is no
/// `data` object) for a non-empty array under each of
/// [`ALTERNATE_ITEM_KEYS`], in that order.
pub fn probe_alternate_keys(body: &Value) -> Option<(&'static str, Vec<Value>)> {
    let data = match body.get("data") {
        Some(data) if data.is_object() => data,
        _ => body,
    };
    for key in ALTERNATE_ITEM_KEYS {
        if let Some(items) = data.get(key).and_then(Value::as_array) {
            if !items.is_empty() {
                return Some((key, items.clone()));
            }
        }
    }
    None
}

/// Unwraps a single-record response: `{ data: {...} }`, `{ farm: {...} }`,
/// or the bare record.
pub fn unwrap_single(body: &Value) -> &Value {
    for key in ["data", "farm"] {
        if let Some(inner) = body.get(key) {
            if inner.is_object() {
                return inner;
            }
        }
    }
    body
}
