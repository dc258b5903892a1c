// src/api/parser.rs
//! Raw backend records → domain model, resolved once at ingestion.
//!
//! Backend payloads are heterogeneous in identifier shape, field naming,
//! and geometry representation. Everything is normalized here, through
//! ordered candidate lists, so downstream code works exclusively with
//! canonical types.

use super::envelope;
use super::types::UploadResponse;
use crate::classify;
use crate::error::AppError;
use crate::model::{resolve_display_name, resolve_location, Farmer, Field};
use crate::types::{extract_id, Boundary, ExternalFileRef, FarmerId, FieldId};
use chrono::NaiveDate;
use serde_json::Value;

/// Candidate paths for a field's own identifier, in priority order.
const FIELD_ID_CANDIDATES: [&str; 4] = ["_id", "id", "farmId", "farm"];

/// Candidate paths for the owning farmer, in priority order: direct field,
/// nested owner object, then the nested "farm" wrapper containing it.
const OWNER_ID_CANDIDATES: [&str; 5] =
    ["farmer", "farmerId", "farmer_id", "owner", "farm.farmer"];

/// Candidate paths for a farmer record's identifier.
const FARMER_ID_CANDIDATES: [&str; 3] = ["_id", "id", "farmerId"];

/// Parses one raw farm record into a [`Field`], stamping its initial
/// processing status.
///
/// Fails only when no identifier can be extracted — every other attribute
/// degrades to its absent form.
pub fn parse_field_record(record: &Value) -> Result<Field, AppError> {
    let id = extract_id(record, &FIELD_ID_CANDIDATES).ok_or_else(|| {
        AppError::MalformedResponse(format!(
            "farm record with no resolvable identifier: {}",
            truncate_for_log(record)
        ))
    })?;
    let id = FieldId::from_raw(id)?;

    let owner = extract_id(record, &OWNER_ID_CANDIDATES)
        .and_then(|raw| FarmerId::from_raw(raw).ok());
    if owner.is_none() {
        log::debug!("field {}: no resolvable owner in record", id);
    }

    let boundary = ["boundary", "geometry", "polygon"]
        .iter()
        .find_map(|key| record.get(*key).and_then(Boundary::from_value));

    let external_file_ref = ["boundaryFileUrl", "kmlUrl", "fileUrl"]
        .iter()
        .find_map(|key| record.get(*key).and_then(Value::as_str))
        .and_then(ExternalFileRef::new);

    let mut field = Field {
        id,
        owner,
        crop_type: first_string(record, &["cropType", "crop", "crop_type"]).unwrap_or_default(),
        area_hectares: first_number(record, &["areaHectares", "area", "area_ha"]),
        season: first_string(record, &["season", "seasonName"]).unwrap_or_default(),
        sowing_date: first_string(record, &["sowingDate", "sowing_date", "plantingDate"])
            .as_deref()
            .and_then(parse_date),
        boundary,
        external_file_ref,
        backend_status: first_string(record, &["status", "processingStatus"]),
        processing_status: crate::model::ProcessingStatus::AwaitingGeometry,
        last_error: None,
    };
    field.processing_status = classify::classify(&field);
    Ok(field)
}

/// Parses a list of raw farm records, skipping (and logging) the ones that
/// cannot be resolved rather than failing the whole batch.
pub fn parse_field_records(records: &[Value]) -> Vec<Field> {
    records
        .iter()
        .filter_map(|record| match parse_field_record(record) {
            Ok(field) => Some(field),
            Err(e) => {
                log::warn!("skipping unparseable farm record: {}", e);
                None
            }
        })
        .collect()
}

/// Parses one raw farmer record, including any embedded field list.
pub fn parse_farmer_record(record: &Value) -> Result<Farmer, AppError> {
    let id = extract_id(record, &FARMER_ID_CANDIDATES).ok_or_else(|| {
        AppError::MalformedResponse(format!(
            "farmer record with no resolvable identifier: {}",
            truncate_for_log(record)
        ))
    })?;
    let id = FarmerId::from_raw(id)?;

    let embedded_fields = ["farms", "fields"]
        .iter()
        .find_map(|key| record.get(*key).and_then(Value::as_array))
        .map(|records| {
            let mut fields = parse_field_records(records);
            // Embedded lists often omit the owner; they are by definition
            // owned by the enclosing farmer.
            for field in &mut fields {
                field.owner.get_or_insert_with(|| id.clone());
            }
            fields
        })
        .unwrap_or_default();

    Ok(Farmer {
        display_name: resolve_display_name(record),
        location: resolve_location(record),
        id,
        embedded_fields,
    })
}

/// Parses the farmer list out of an assigned-farmers response.
pub fn parse_farmer_records(body: &Value) -> Vec<Farmer> {
    let records = envelope::unwrap_item_list(body).unwrap_or_default();
    records
        .iter()
        .filter_map(|record| match parse_farmer_record(record) {
            Ok(farmer) => Some(farmer),
            Err(e) => {
                log::warn!("skipping unparseable farmer record: {}", e);
                None
            }
        })
        .collect()
}

/// Parses a boundary-upload response body.
pub fn parse_upload_response(body: &Value) -> UploadResponse {
    let record = envelope::unwrap_single(body);
    UploadResponse {
        boundary: record.get("boundary").and_then(Boundary::from_value),
        location: parse_location_value(record.get("location")),
        area_hectares: first_number(record, &["area", "areaHectares"]),
        status: first_string(record, &["status"]),
        external_processing_warning: first_string(record, &["eosdaWarning", "processingWarning"]),
    }
}

/// A location in an upload response may be a plain string or a nested
/// province/district object; both resolve to one descriptor.
fn parse_location_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        obj @ Value::Object(_) => Some(resolve_location(obj)),
        _ => None,
    }
}

/// First non-blank string among the candidate keys.
fn first_string(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let raw = record.get(*key)?.as_str()?;
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// First numeric value among the candidate keys; tolerates numbers encoded
/// as strings.
fn first_number(record: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| {
        let value = record.get(*key)?;
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
    })
}

/// Parses a sowing date in either plain-date or RFC 3339 form.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Compact record preview for error messages.
fn truncate_for_log(record: &Value) -> String {
    let raw = record.to_string();
    if raw.len() > 200 {
        format!("{}...", &raw[..200])
    } else {
        raw
    }
}
