// src/upload/mod.rs
//! The boundary-upload state machine.
//!
//! Drives a field from `AwaitingGeometry` through `Processing` to
//! `Processed` or `Error`. Preconditions are checked before any state
//! change or network call and come back as typed values. On success the
//! upload response is the ground truth: its boundary/location/area merge
//! over cached values and the status is forced to `Processed` no matter
//! what status string the backend reports alongside. On failure the field
//! moves to `Error` with the message retained and nothing else touched.

pub mod batch;

use crate::api::{parser, FarmBackend};
use crate::config::EngineConfig;
use crate::constants::ACCEPTED_BOUNDARY_EXTENSIONS;
use crate::error::UploadError;
use crate::model::{Field, FieldPatch, ProcessingStatus};
use crate::store::FieldStore;
use crate::types::{FieldId, Warning};
use dashmap::DashMap;
use std::sync::Arc;

pub use batch::{BatchItemOutcome, BatchOutcome, BatchUploadCoordinator};

/// An in-memory boundary file handed in by the caller.
#[derive(Debug, Clone)]
pub struct BoundaryFile {
    file_name: String,
    bytes: Vec<u8>,
}

impl BoundaryFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lowercased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.file_name.rsplit_once('.')?;
        (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
    }
}

/// Successful upload result.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub field_id: FieldId,
    /// Always `Processed`; present so batch reporting carries the state.
    pub status: ProcessingStatus,
    /// Non-fatal degradation notice (external geometry processing was
    /// disabled backend-side). Downgrades the message, not the outcome.
    pub warning: Option<Warning>,
}

/// Owns upload sequencing and the Processing → terminal transitions.
pub struct UploadSupervisor {
    backend: Arc<dyn FarmBackend>,
    store: Arc<FieldStore>,
    config: EngineConfig,
    /// Fields with an upload in flight; a second upload for the same field
    /// is rejected rather than raced.
    in_flight: DashMap<FieldId, ()>,
}

impl UploadSupervisor {
    pub fn new(backend: Arc<dyn FarmBackend>, store: Arc<FieldStore>, config: EngineConfig) -> Self {
        Self {
            backend,
            store,
            config,
            in_flight: DashMap::new(),
        }
    }

    /// Checks the upload preconditions without changing any state.
    pub fn validate(&self, field: &Field, file: &BoundaryFile) -> Result<(), UploadError> {
        if field.id.is_placeholder() {
            return Err(UploadError::MissingBackendIdentity);
        }
        match file.extension() {
            Some(ext) if ACCEPTED_BOUNDARY_EXTENSIONS.contains(&ext.as_str()) => {}
            other => {
                return Err(UploadError::UnsupportedFileType {
                    extension: other.unwrap_or_default(),
                })
            }
        }
        if file.size() > self.config.max_upload_bytes {
            return Err(UploadError::FileTooLarge {
                size: file.size(),
                limit: self.config.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Runs one boundary upload through the full state machine.
    ///
    /// The store update on success completes before this returns, so a
    /// caller re-reading the index immediately after never observes stale
    /// data.
    pub async fn begin_upload(
        &self,
        field_id: &FieldId,
        file: &BoundaryFile,
        display_name: Option<&str>,
    ) -> Result<UploadOutcome, UploadError> {
        let Some(field) = self.store.field(field_id) else {
            // An id the store has never seen has no backend identity the
            // engine can vouch for.
            return Err(UploadError::MissingBackendIdentity);
        };

        self.validate(&field, file)?;

        // Claim the field; transitions for one field are strictly
        // sequential.
        match self.in_flight.entry(field_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(UploadError::AlreadyInProgress)
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(());
            }
        }

        self.store
            .apply_field_update(field_id, FieldPatch::status(ProcessingStatus::Processing));
        log::info!(
            "uploading boundary for field {} ({} bytes as '{}')",
            field_id,
            file.size(),
            file.file_name()
        );

        let result = self
            .backend
            .upload_boundary(field_id, file, display_name)
            .await;
        // Release the claim before reporting either outcome; `Error` is
        // retryable and a retry must not see a stale claim.
        self.in_flight.remove(field_id);

        match result {
            Ok(body) => {
                let response = parser::parse_upload_response(&body);
                if let Some(status) = &response.status {
                    log::debug!(
                        "field {}: backend reported status '{}' with the upload; \
                         forcing processed",
                        field_id,
                        status
                    );
                }
                let warning = response
                    .external_processing_warning
                    .as_deref()
                    .map(Warning::warning);

                self.store.apply_field_update(
                    field_id,
                    FieldPatch {
                        boundary: response.boundary,
                        location: response.location,
                        area_hectares: response.area_hectares,
                        backend_status: response.status,
                        processing_status: Some(ProcessingStatus::Processed),
                        last_error: Some(None),
                    },
                );

                Ok(UploadOutcome {
                    field_id: field_id.clone(),
                    status: ProcessingStatus::Processed,
                    warning,
                })
            }
            Err(e) => {
                let message = e.to_string();
                log::warn!("boundary upload failed for field {}: {}", field_id, message);
                self.store
                    .apply_field_update(field_id, FieldPatch::upload_failure(message.clone()));
                Err(UploadError::UploadFailed { message })
            }
        }
    }
}
