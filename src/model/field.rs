// src/model/field.rs
//! The field record and its processing lifecycle.

use crate::types::{Boundary, ExternalFileRef, FarmerId, FieldId};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Status strings the backend uses to mean "geometry processing is done".
///
/// Matching is case-sensitive on these exact literals. Do not add literals
/// here without confirming the backend's actual status vocabulary — a
/// guessed literal turns the conservative default into silent false
/// positives.
static DONE_STATUS_LITERALS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["PROCESSED", "Processed"]));

/// Status strings the backend uses to mean "still awaiting geometry".
static PENDING_STATUS_LITERALS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["PENDING", "Processing Needed", ""]));

/// Whether a backend status string is a recognized "done" literal.
pub fn is_done_status_literal(status: &str) -> bool {
    DONE_STATUS_LITERALS.contains(status)
}

/// Whether a backend status string is a recognized "pending" literal.
pub fn is_pending_status_literal(status: &str) -> bool {
    PENDING_STATUS_LITERALS.contains(status)
}

/// Geometry-processing lifecycle of a field.
///
/// Derived, not authoritative: the true signal of `Processed` is valid
/// boundary geometry or a recognized done literal. Absence of evidence of
/// completion is treated as incompletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessingStatus {
    /// No boundary geometry yet; the starting state.
    AwaitingGeometry,
    /// A boundary upload is in flight.
    Processing,
    /// Valid geometry is present (or a successful upload just confirmed it).
    Processed,
    /// The last upload failed; retryable.
    Error,
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingGeometry => write!(f, "awaiting_geometry"),
            Self::Processing => write!(f, "processing"),
            Self::Processed => write!(f, "processed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single insurable land parcel with crop and geometry attributes.
///
/// Owned by the backend system of record; the engine only caches and
/// classifies. `owner` is resolved once at ingestion and stable thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub id: FieldId,
    /// Owning farmer, when the raw record expressed one resolvably.
    pub owner: Option<FarmerId>,
    pub crop_type: String,
    pub area_hectares: Option<f64>,
    pub season: String,
    pub sowing_date: Option<NaiveDate>,
    pub boundary: Option<Boundary>,
    pub external_file_ref: Option<ExternalFileRef>,
    /// Raw status string as the backend reported it, verbatim.
    pub backend_status: Option<String>,
    pub processing_status: ProcessingStatus,
    /// Message from the most recent failed upload, retained across retries.
    pub last_error: Option<String>,
}

impl Field {
    /// Whether this field belongs to the given farmer (exact id match only).
    pub fn is_owned_by(&self, farmer: &FarmerId) -> bool {
        self.owner.as_ref().map(|o| o == farmer).unwrap_or(false)
    }
}

/// A partial update to a field, applied through the store's single write
/// path. `None` means "leave unchanged"; wrapped `Option`s distinguish
/// "set to absent" from "leave unchanged" where that matters.
#[derive(Debug, Clone, Default)]
pub struct FieldPatch {
    pub boundary: Option<Boundary>,
    pub location: Option<String>,
    pub area_hectares: Option<f64>,
    pub backend_status: Option<String>,
    pub processing_status: Option<ProcessingStatus>,
    /// `Some(None)` clears a previous error; `Some(Some(m))` records one.
    pub last_error: Option<Option<String>>,
}

impl FieldPatch {
    /// A patch that only moves the processing status.
    pub fn status(status: ProcessingStatus) -> Self {
        Self {
            processing_status: Some(status),
            ..Self::default()
        }
    }

    /// A patch recording a failed upload: status to `Error`, message kept,
    /// everything else untouched (no partial mutation on failure).
    pub fn upload_failure(message: impl Into<String>) -> Self {
        Self {
            processing_status: Some(ProcessingStatus::Error),
            last_error: Some(Some(message.into())),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_literals_are_case_sensitive() {
        assert!(is_done_status_literal("PROCESSED"));
        assert!(is_done_status_literal("Processed"));
        assert!(!is_done_status_literal("processed"));
        assert!(!is_done_status_literal("PROCESSED "));
    }

    #[test]
    fn pending_literals_include_the_empty_string() {
        assert!(is_pending_status_literal("PENDING"));
        assert!(is_pending_status_literal("Processing Needed"));
        assert!(is_pending_status_literal(""));
        assert!(!is_pending_status_literal("pending"));
    }

    #[test]
    fn literal_sets_are_disjoint() {
        for done in ["PROCESSED", "Processed"] {
            assert!(!is_pending_status_literal(done));
        }
    }
}
