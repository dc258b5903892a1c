// src/types/mod.rs
//! Core domain types shared across the engine.

mod geometry;
mod ids;

pub use geometry::{Boundary, ExternalFileRef};
pub use ids::{extract_id, ids_match, FarmerId, FieldId, Id, IdMatch};

use thiserror::Error;

/// Validation failures for domain-type construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Empty value for {0}")]
    EmptyValue(&'static str),
}

/// Severity of a non-fatal condition surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningLevel {
    Info,
    Warning,
}

/// A non-fatal condition attached to an otherwise successful operation.
///
/// Warnings downgrade the user-facing message, never the operation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub level: WarningLevel,
    pub message: String,
}

impl Warning {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: WarningLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarningLevel::Warning,
            message: message.into(),
        }
    }
}
