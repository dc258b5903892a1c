// tests/common/mod.rs
//! Shared mock backend for integration tests.
#![allow(dead_code)] // each test binary uses a different subset of helpers

use async_trait::async_trait;
use fieldsync::{AppError, BackendErrorCode, BoundaryFile, FarmBackend, FieldId};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Scripted outcome for one field's boundary upload.
pub enum UploadScript {
    Succeed(Value),
    Fail(String),
}

/// A scriptable in-memory farm backend.
///
/// Unscripted endpoints answer with well-formed empty envelopes, so each
/// test only scripts what it exercises.
#[derive(Default)]
pub struct MockBackend {
    /// (page, page_size) → response body.
    pub pages: Mutex<HashMap<(u32, u32), Value>>,
    /// Response for the no-pagination endpoint.
    pub all_response: Mutex<Option<Value>>,
    /// Response for the assigned-farmers endpoint.
    pub farmers_response: Mutex<Option<Value>>,
    /// field id → single-farm response body.
    pub farm_responses: Mutex<HashMap<String, Value>>,
    /// field id → scripted upload outcome.
    pub upload_scripts: Mutex<HashMap<String, UploadScript>>,
    /// Artificial latency before each upload response resolves.
    pub upload_delay_ms: AtomicU64,
    /// Every catalog page request observed, in order.
    pub page_calls: Mutex<Vec<(u32, u32)>>,
    /// Every upload observed, in order of arrival.
    pub upload_calls: Mutex<Vec<String>>,
    /// Every status patch observed.
    pub status_calls: Mutex<Vec<(String, String)>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a page response in the standard success envelope.
    pub fn script_page(&self, page: u32, page_size: u32, items: Value, total: u64) {
        self.pages.lock().insert(
            (page, page_size),
            json!({
                "success": true,
                "data": { "items": items, "totalItems": total, "currentPage": page, "totalPages": 1 }
            }),
        );
    }

    /// Scripts a page response body verbatim.
    pub fn script_page_raw(&self, page: u32, page_size: u32, body: Value) {
        self.pages.lock().insert((page, page_size), body);
    }

    pub fn script_all(&self, body: Value) {
        *self.all_response.lock() = Some(body);
    }

    pub fn script_farmers(&self, body: Value) {
        *self.farmers_response.lock() = Some(body);
    }

    pub fn script_upload(&self, field_id: &str, script: UploadScript) {
        self.upload_scripts.lock().insert(field_id.to_string(), script);
    }

    fn empty_page(page: u32) -> Value {
        json!({
            "success": true,
            "data": { "items": [], "totalItems": 0, "currentPage": page, "totalPages": 0 }
        })
    }
}

#[async_trait]
impl FarmBackend for MockBackend {
    async fn fetch_farm_page(&self, page: u32, page_size: u32) -> Result<Value, AppError> {
        self.page_calls.lock().push((page, page_size));
        Ok(self
            .pages
            .lock()
            .get(&(page, page_size))
            .cloned()
            .unwrap_or_else(|| Self::empty_page(page)))
    }

    async fn fetch_all_farms(&self) -> Result<Value, AppError> {
        Ok(self
            .all_response
            .lock()
            .clone()
            .unwrap_or_else(|| json!([])))
    }

    async fn fetch_farm(&self, id: &FieldId) -> Result<Value, AppError> {
        self.farm_responses
            .lock()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| AppError::BackendService {
                code: BackendErrorCode::RecordNotFound,
                message: format!("no farm {}", id),
            })
    }

    async fn fetch_assigned_farmers(&self) -> Result<Value, AppError> {
        Ok(self
            .farmers_response
            .lock()
            .clone()
            .unwrap_or_else(|| json!({ "items": [] })))
    }

    async fn upload_boundary(
        &self,
        id: &FieldId,
        _file: &BoundaryFile,
        _display_name: Option<&str>,
    ) -> Result<Value, AppError> {
        self.upload_calls.lock().push(id.as_str().to_string());
        let delay = self.upload_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        match self.upload_scripts.lock().get(id.as_str()) {
            Some(UploadScript::Succeed(body)) => Ok(body.clone()),
            Some(UploadScript::Fail(message)) => Err(AppError::BackendService {
                code: BackendErrorCode::ValidationFailed,
                message: message.clone(),
            }),
            None => Ok(json!({ "status": "REGISTERED" })),
        }
    }

    async fn update_farm_status(&self, id: &FieldId, status: &str) -> Result<Value, AppError> {
        self.status_calls
            .lock()
            .push((id.as_str().to_string(), status.to_string()));
        Ok(json!({ "success": true }))
    }
}

/// A minimal raw farm record in the backend's usual shape.
pub fn farm_record(id: &str, farmer_id: &str) -> Value {
    json!({
        "_id": id,
        "farmer": { "_id": farmer_id },
        "cropType": "maize",
        "areaHectares": 1.0,
        "season": "2026A",
        "status": "PENDING"
    })
}

/// A KML boundary file of the given size.
pub fn kml_file(name: &str, size: usize) -> BoundaryFile {
    BoundaryFile::new(name, vec![b'k'; size])
}
