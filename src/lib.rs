// src/lib.rs
//! fieldsync — field boundary ingestion and reconciliation for
//! agricultural-insurance operations.
//!
//! The engine obtains an authoritative, de-duplicated farm catalog from a
//! backend whose pagination and identifier shapes are unreliable, indexes
//! fields by farmer, classifies each field's geometry-processing status,
//! and drives fields through a boundary-upload state machine — including
//! concurrent batch uploads — with every derived view reading one
//! authoritative store.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling** — `AppError`, `UploadError`, `BackendErrorCode`
//! - **Configuration** — `EngineConfig`
//! - **Domain model** — `Farmer`, `Field`, `ProcessingStatus`, `Boundary`
//! - **Domain types** — `FarmerId`, `FieldId`, `IdMatch`
//! - **Backend seam** — `FarmBackend`, `FarmHttpClient`, `CatalogFetcher`
//! - **Uploads** — `BoundaryFile`, `UploadOutcome`, `BatchOutcome`
//! - **Facade** — `ReconciliationEngine` and its `EngineEvent` stream

mod api;
mod classify;
mod config;
mod constants;
mod engine;
mod error;
mod error_recovery;
mod events;
mod index;
mod model;
mod store;
mod types;
mod upload;

// --- Error Handling ---
pub use crate::error::{AppError, BackendErrorCode, UploadError};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::EngineConfig;

// --- Domain Model ---
pub use crate::model::{
    is_done_status_literal, is_pending_status_literal, Farmer, Field, FieldPatch,
    ProcessingStatus,
};
pub use crate::model::{resolve_display_name, resolve_location};

// --- Domain Types ---
pub use crate::types::{
    extract_id, ids_match, Boundary, ExternalFileRef, FarmerId, FieldId, IdMatch, Warning,
    WarningLevel,
};

// --- Classification ---
pub use crate::classify::{classify, is_processed};

// --- Backend Seam ---
pub use crate::api::{
    CatalogFetchOutcome, CatalogFetcher, FarmBackend, FarmHttpClient, FetchStrategy,
    UploadResponse,
};

// --- Store & Index ---
pub use crate::index::FarmerFieldIndex;
pub use crate::store::FieldStore;

// --- Uploads ---
pub use crate::upload::{
    BatchItemOutcome, BatchOutcome, BatchUploadCoordinator, BoundaryFile, UploadOutcome,
    UploadSupervisor,
};

// --- Facade & Events ---
pub use crate::engine::{ReconciliationEngine, RefreshSummary};
pub use crate::events::{EngineEvent, EventHub};
