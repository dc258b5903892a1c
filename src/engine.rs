// src/engine.rs
//! The reconciliation engine facade.
//!
//! Wires the backend seam, the authoritative store, the farmer index, and
//! the upload machinery into the surface the host application consumes:
//! refresh, per-farmer reads, status queries, single and batch uploads,
//! and the event stream.

use crate::api::{envelope, parser, CatalogFetcher, FarmBackend, FetchStrategy};
use crate::classify;
use crate::config::EngineConfig;
use crate::error::{AppError, UploadError};
use crate::error_recovery::retry_with_backoff;
use crate::events::EngineEvent;
use crate::index::FarmerFieldIndex;
use crate::model::{Field, FieldPatch, ProcessingStatus};
use crate::store::FieldStore;
use crate::types::FieldId;
use crate::upload::{
    BatchOutcome, BatchUploadCoordinator, BoundaryFile, UploadOutcome, UploadSupervisor,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;

/// What a catalog refresh brought back.
#[derive(Debug)]
pub struct RefreshSummary {
    pub farmers: usize,
    pub fields: usize,
    /// Which rung of the retrieval ladder produced the catalog.
    pub strategy: FetchStrategy,
}

/// Current processing selection: the fields picked for batch upload and
/// the field open in the detail view. Both are ids into the store, so the
/// "selected copy" can never drift from the catalog copy.
#[derive(Default)]
struct Selection {
    fields: Vec<FieldId>,
    detail: Option<FieldId>,
}

/// The engine facade. Cheap to share behind an `Arc`.
pub struct ReconciliationEngine {
    backend: Arc<dyn FarmBackend>,
    store: Arc<FieldStore>,
    index: FarmerFieldIndex,
    catalog: CatalogFetcher,
    supervisor: Arc<UploadSupervisor>,
    batch: BatchUploadCoordinator,
    config: EngineConfig,
    selection: Mutex<Selection>,
}

impl ReconciliationEngine {
    pub fn new(backend: Arc<dyn FarmBackend>, config: EngineConfig) -> Self {
        let store = Arc::new(FieldStore::new(crate::events::EventHub::new()));
        let index = FarmerFieldIndex::new(Arc::clone(&store));
        let catalog = CatalogFetcher::new(Arc::clone(&backend), config.clone());
        let supervisor = Arc::new(UploadSupervisor::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            config.clone(),
        ));
        let batch = BatchUploadCoordinator::new(Arc::clone(&supervisor));
        Self {
            backend,
            store,
            index,
            catalog,
            supervisor,
            batch,
            config,
            selection: Mutex::new(Selection::default()),
        }
    }

    /// Subscribes to index/status change events from this point onward.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.store.events().subscribe()
    }

    // -----------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------

    /// Re-synchronizes the engine with the backend: assigned farmers, then
    /// the full catalog through the retrieval ladder.
    ///
    /// The farmer fetch is best-effort — a failure there degrades display
    /// names and embedded lists, not the catalog itself.
    pub async fn refresh(&self) -> Result<RefreshSummary, AppError> {
        let farmers = match self.fetch_assigned_farmers().await {
            Ok(farmers) => farmers,
            Err(e) => {
                log::warn!("assigned-farmer fetch failed; keeping known farmers: {}", e);
                vec![]
            }
        };
        let farmer_count = farmers.len();
        if farmer_count > 0 {
            self.store.upsert_farmers(farmers);
        }

        let outcome = self.catalog.fetch_all().await?;
        let field_count = outcome.fields.len();
        self.store.replace_catalog(outcome.fields);

        log::info!(
            "refresh complete: {} farmers, {} fields via {}",
            farmer_count,
            field_count,
            outcome.strategy
        );
        Ok(RefreshSummary {
            farmers: farmer_count,
            fields: field_count,
            strategy: outcome.strategy,
        })
    }

    async fn fetch_assigned_farmers(&self) -> Result<Vec<crate::model::Farmer>, AppError> {
        let backend = Arc::clone(&self.backend);
        let body = retry_with_backoff(
            || {
                let backend = Arc::clone(&backend);
                async move { backend.fetch_assigned_farmers().await }
            },
            self.config.read_retry_attempts,
            self.config.read_retry_initial_delay,
            self.config.read_retry_max_delay,
        )
        .await?;
        Ok(parser::parse_farmer_records(&body))
    }

    /// Re-reconciles a single field from the backend without a full
    /// catalog fetch. An in-flight upload keeps ownership of the status.
    pub async fn refresh_field(&self, field_id: &FieldId) -> Result<(), AppError> {
        let body = self.backend.fetch_farm(field_id).await?;
        let fresh = parser::parse_field_record(envelope::unwrap_single(&body))?;

        let in_flight = self.store.status(field_id) == Some(ProcessingStatus::Processing);
        self.store.apply_field_update(
            field_id,
            FieldPatch {
                boundary: fresh.boundary,
                area_hectares: fresh.area_hectares,
                backend_status: fresh.backend_status,
                processing_status: (!in_flight).then_some(fresh.processing_status),
                ..FieldPatch::default()
            },
        );
        Ok(())
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// Ordered field list for a farmer, tolerant of key-format variation.
    pub fn get_fields_for_farmer(&self, farmer_key: &str) -> Vec<Field> {
        self.index.get(farmer_key)
    }

    pub fn get_processing_status(&self, field_id: &FieldId) -> Option<ProcessingStatus> {
        self.store.status(field_id)
    }

    pub fn get_field(&self, field_id: &FieldId) -> Option<Field> {
        self.store.field(field_id)
    }

    /// The flat catalog, in ingestion order.
    pub fn catalog_fields(&self) -> Vec<Field> {
        self.store.all_fields()
    }

    // -----------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------

    pub fn select_fields(&self, field_ids: Vec<FieldId>) {
        self.selection.lock().fields = field_ids;
    }

    pub fn selected_fields(&self) -> Vec<FieldId> {
        self.selection.lock().fields.clone()
    }

    pub fn select_detail(&self, field_id: Option<FieldId>) {
        self.selection.lock().detail = field_id;
    }

    /// The field open in the detail view, read through the store so it is
    /// always the same copy every other view sees.
    pub fn selected_detail(&self) -> Option<Field> {
        let id = self.selection.lock().detail.clone()?;
        self.store.field(&id)
    }

    /// Clears the processing selection. Pending UI state only — in-flight
    /// uploads are not aborted and still apply their updates on completion.
    pub fn clear_selection(&self) {
        let mut selection = self.selection.lock();
        selection.fields.clear();
        selection.detail = None;
    }

    // -----------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------

    /// Uploads a boundary file for one field through the state machine.
    pub async fn begin_upload(
        &self,
        field_id: &FieldId,
        file: &BoundaryFile,
        display_name: Option<&str>,
    ) -> Result<UploadOutcome, UploadError> {
        self.supervisor.begin_upload(field_id, file, display_name).await
    }

    /// Uploads boundary files for several fields concurrently.
    ///
    /// The selection is set for the duration of the batch and cleared only
    /// after every outcome has resolved — success or failure — never
    /// mid-batch.
    pub async fn begin_batch_upload(
        &self,
        field_ids: Vec<FieldId>,
        files: Vec<BoundaryFile>,
    ) -> BatchOutcome {
        self.select_fields(field_ids.clone());
        let outcome = self.batch.process_many(field_ids, files).await;
        self.clear_selection();
        outcome
    }

    /// Pushes a backend status update for a field and reconciles the local
    /// classification with it.
    pub async fn set_backend_status(
        &self,
        field_id: &FieldId,
        status: &str,
    ) -> Result<(), AppError> {
        self.backend.update_farm_status(field_id, status).await?;

        if let Some(mut field) = self.store.field(field_id) {
            field.backend_status = Some(status.to_string());
            let in_flight = field.processing_status == ProcessingStatus::Processing;
            self.store.apply_field_update(
                field_id,
                FieldPatch {
                    backend_status: Some(status.to_string()),
                    processing_status: (!in_flight).then(|| classify::classify(&field)),
                    ..FieldPatch::default()
                },
            );
        }
        Ok(())
    }
}
