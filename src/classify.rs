// src/classify.rs
//! Geometry-processing classification.
//!
//! Decides whether a field currently has valid boundary geometry, from any
//! of the evidence kinds the backend emits. The governing rule: absence of
//! evidence of completion is incompletion. Unrecognized status strings are
//! never promoted to "done" — they classify as unprocessed and are logged
//! so a vocabulary gap stays observable instead of silently hiding fields.

use crate::model::{is_done_status_literal, is_pending_status_literal, Field, ProcessingStatus};

/// Whether a field counts as geometry-processed.
///
/// True when any of the following holds:
/// - a boundary with at least one vertex is present (Polygon, Feature,
///   FeatureCollection, or bare ring array alike);
/// - a non-empty external boundary-file reference is present;
/// - the backend status is a recognized done literal (case-sensitive).
///
/// Pure over the field value: calling it twice without mutation returns the
/// same result.
pub fn is_processed(field: &Field) -> bool {
    if let Some(boundary) = &field.boundary {
        if boundary.has_coordinates() {
            return true;
        }
    }
    if field.external_file_ref.is_some() {
        return true;
    }
    match field.backend_status.as_deref() {
        Some(status) => {
            if is_done_status_literal(status) {
                return true;
            }
            if !is_pending_status_literal(status) {
                // Conservative default: an unknown literal is not completion
                // evidence, but it may be a vocabulary gap worth noticing.
                log::warn!(
                    "field {}: unrecognized backend status '{}' treated as unprocessed",
                    field.id,
                    status
                );
            }
            false
        }
        None => false,
    }
}

/// Stamps the initial processing status for a freshly ingested field.
///
/// Fields with geometry evidence skip straight to `Processed`; everything
/// else starts at `AwaitingGeometry`. `Processing` and `Error` are runtime
/// states and never assigned at ingestion.
pub fn classify(field: &Field) -> ProcessingStatus {
    if is_processed(field) {
        ProcessingStatus::Processed
    } else {
        ProcessingStatus::AwaitingGeometry
    }
}
