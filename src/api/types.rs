// src/api/types.rs
//! Type definitions for the backend-interaction module.

use crate::types::Boundary;
use std::fmt;

/// The retrieval strategies of the catalog fallback ladder, in the order
/// they are tried. Each strategy only fires after the previous one is
/// confirmed empty — the ladder is sequential on purpose, to avoid
/// amplifying load against a backend already exhibiting pagination bugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Page 1 at the standard page size (1-based pagination assumption).
    PrimaryPagination,
    /// Page 0 at the standard page size (0-based pagination assumption).
    ZeroBasedPagination,
    /// Page 0 at the wide page size.
    WidePage,
    /// The no-pagination `/farms/all` endpoint variant.
    Unpaginated,
    /// Probing alternate envelope keys inside the last response.
    AlternateEnvelopeKeys,
}

impl FetchStrategy {
    /// All strategies in ladder order.
    pub const LADDER: [FetchStrategy; 5] = [
        FetchStrategy::PrimaryPagination,
        FetchStrategy::ZeroBasedPagination,
        FetchStrategy::WidePage,
        FetchStrategy::Unpaginated,
        FetchStrategy::AlternateEnvelopeKeys,
    ];
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryPagination => write!(f, "primary pagination (page 1)"),
            Self::ZeroBasedPagination => write!(f, "zero-based pagination (page 0)"),
            Self::WidePage => write!(f, "wide page probe"),
            Self::Unpaginated => write!(f, "unpaginated endpoint"),
            Self::AlternateEnvelopeKeys => write!(f, "alternate envelope keys"),
        }
    }
}

/// Parsed body of a successful boundary-upload response.
///
/// Every member is optional — the backend omits freely — but whatever is
/// present takes priority over previously cached values for the field.
#[derive(Debug, Clone, Default)]
pub struct UploadResponse {
    pub boundary: Option<Boundary>,
    pub location: Option<String>,
    pub area_hectares: Option<f64>,
    /// Backend's own status string; recorded verbatim but never allowed to
    /// override the Processed transition a successful upload implies.
    pub status: Option<String>,
    /// Non-fatal warning that external geometry processing is degraded or
    /// disabled; downgrades the user-facing message only.
    pub external_processing_warning: Option<String>,
}
