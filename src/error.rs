// src/error.rs
//! Engine error types with structured error handling.
//!
//! Two vocabularies live here. [`AppError`] covers transport, parsing, and
//! backend failures seen while fetching or mutating records. [`UploadError`]
//! is the typed outcome set for the boundary-upload flow — precondition
//! failures are returned as values and branch explicitly at the call site,
//! never raised as control-flow panics.

use std::fmt;
use thiserror::Error;

/// Backend error codes as a typed vocabulary.
///
/// Instead of matching against magic strings, the failure vocabulary is
/// encoded in the type system so recovery decisions are pattern matches,
/// not substring probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendErrorCode {
    /// Request rate limit exceeded — back off and retry.
    RateLimited,
    /// The requested record does not exist or is inaccessible.
    RecordNotFound,
    /// Credentials missing or expired.
    Unauthorized,
    /// Authenticated but not permitted for this record.
    Forbidden,
    /// Request parameters failed backend validation.
    ValidationFailed,
    /// Backend internal error.
    InternalError,
    /// Backend temporarily unavailable.
    ServiceUnavailable,
    /// HTTP status fallback when the error body is unparseable.
    HttpStatus(u16),
    /// An error code this engine doesn't recognize yet.
    Unknown(String),
}

impl BackendErrorCode {
    /// Parses a backend error-code string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "rate_limited" | "too_many_requests" => Self::RateLimited,
            "not_found" | "record_not_found" => Self::RecordNotFound,
            "unauthorized" => Self::Unauthorized,
            "forbidden" | "restricted" => Self::Forbidden,
            "validation_error" => Self::ValidationFailed,
            "internal_server_error" => Self::InternalError,
            "service_unavailable" => Self::ServiceUnavailable,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Creates from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::RecordNotFound,
            429 => Self::RateLimited,
            500 => Self::InternalError,
            503 => Self::ServiceUnavailable,
            other => Self::HttpStatus(other),
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServiceUnavailable | Self::InternalError
        )
    }
}

impl fmt::Display for BackendErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::RecordNotFound => write!(f, "record_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::ValidationFailed => write!(f, "validation_error"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Main engine error type for fetch/parse/mutation failures.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Backend returned an error ({code}): {message}")]
    BackendService {
        code: BackendErrorCode,
        message: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The backend claims records exist but every retrieval strategy came
    /// back empty. Distinct from a genuinely empty catalog so callers can
    /// surface a data-inconsistency warning instead of showing zero records.
    #[error(
        "Backend reports {total_reported} records but all {strategies_tried} retrieval strategies returned none"
    )]
    PartialBackendFailure {
        total_reported: u64,
        strategies_tried: usize,
    },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),
}

// Allow converting from anyhow::Error, preserving the message.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalError {
            message: err.to_string(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

impl AppError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkFailure(_) => true,
            AppError::BackendService { code, .. } => code.is_retryable(),
            _ => false,
        }
    }
}

/// Typed outcomes for the boundary-upload flow.
///
/// The first three variants are precondition failures: they are returned
/// before any state transition or network call, and the field is left
/// untouched. The rest describe the upload itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// The field has no usable backend identity (empty or placeholder id).
    #[error("Field has no backend identity; cannot upload a boundary for it")]
    MissingBackendIdentity,

    /// The file extension is not an accepted boundary format.
    #[error("Unsupported boundary file type '.{extension}' (accepted: .kml, .kmz)")]
    UnsupportedFileType { extension: String },

    /// The file exceeds the upload size cap.
    #[error("Boundary file is {size} bytes; limit is {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },

    /// An upload for this field is already in flight; transitions for a
    /// single field are strictly sequential.
    #[error("An upload for this field is already in progress")]
    AlreadyInProgress,

    /// The backend rejected the upload or the transport failed.
    #[error("Boundary upload failed: {message}")]
    UploadFailed { message: String },
}

/// Result type alias for convenience.
pub type Result<T, E = AppError> = std::result::Result<T, E>;
