// src/api/mod.rs
//! Farm-backend interaction — the ability to retrieve and mutate farm
//! records.
//!
//! This module provides a data-oriented interface to the backend, with
//! clear separation between I/O operations, envelope unwrapping, parsing,
//! and the retrieval-strategy ladder. Business logic depends on the
//! [`FarmBackend`] trait, never on HTTP details.

pub mod catalog;
pub mod client;
pub mod envelope;
pub mod parser;
mod types;

use crate::error::AppError;
use crate::types::FieldId;
use crate::upload::BoundaryFile;
use serde_json::Value;

/// The ability to reach the farm backend.
///
/// Every method returns the raw response body as JSON: the backend's
/// envelope shapes are unreliable, so unwrapping and parsing stay on this
/// side of the seam where they can be strategy-driven and test-covered.
#[async_trait::async_trait]
pub trait FarmBackend: Send + Sync {
    /// `GET /farms?page&pageSize` — one page of the farm catalog.
    async fn fetch_farm_page(&self, page: u32, page_size: u32) -> Result<Value, AppError>;

    /// `GET /farms/all` — the no-pagination catalog variant.
    async fn fetch_all_farms(&self) -> Result<Value, AppError>;

    /// `GET /farms/{id}` — a single farm, possibly wrapped.
    async fn fetch_farm(&self, id: &FieldId) -> Result<Value, AppError>;

    /// `GET /farmers/assigned` — farmers scoped to the caller's identity.
    async fn fetch_assigned_farmers(&self) -> Result<Value, AppError>;

    /// `POST /farms/{id}/boundary` — multipart boundary-file upload.
    async fn upload_boundary(
        &self,
        id: &FieldId,
        file: &BoundaryFile,
        display_name: Option<&str>,
    ) -> Result<Value, AppError>;

    /// `PATCH /farms/{id}` — backend status update.
    async fn update_farm_status(&self, id: &FieldId, status: &str) -> Result<Value, AppError>;
}

// Re-export the public interface
pub use catalog::{CatalogFetchOutcome, CatalogFetcher};
pub use client::FarmHttpClient;
pub use types::{FetchStrategy, UploadResponse};
