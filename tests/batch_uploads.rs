// tests/batch_uploads.rs
//! Integration tests for batch boundary uploads.

mod common;

use common::{farm_record, kml_file, MockBackend, UploadScript};
use fieldsync::{
    BatchItemOutcome, EngineConfig, FieldId, ProcessingStatus, ReconciliationEngine,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn fid(raw: &str) -> FieldId {
    FieldId::from_raw(raw).unwrap()
}

async fn engine_with_three_fields(backend: Arc<MockBackend>) -> ReconciliationEngine {
    backend.script_page(
        1,
        100,
        json!([
            farm_record("f1", "farmer-a"),
            farm_record("f2", "farmer-a"),
            farm_record("f3", "farmer-b")
        ]),
        3,
    );
    let engine = ReconciliationEngine::new(backend, EngineConfig::default());
    engine.refresh().await.unwrap();
    engine
}

#[tokio::test]
async fn one_failure_does_not_block_the_siblings() {
    let backend = Arc::new(MockBackend::new());
    backend.script_upload("f1", UploadScript::Succeed(json!({ "status": "PROCESSED" })));
    backend.script_upload("f2", UploadScript::Fail("corrupt KML".into()));
    backend.script_upload("f3", UploadScript::Succeed(json!({ "status": "PROCESSED" })));
    let engine = engine_with_three_fields(Arc::clone(&backend)).await;

    let outcome = engine
        .begin_batch_upload(
            vec![fid("f1"), fid("f2"), fid("f3")],
            vec![
                kml_file("f1.kml", 10),
                kml_file("f2.kml", 10),
                kml_file("f3.kml", 10),
            ],
        )
        .await;

    assert_eq!(outcome.attempted, 3);
    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.outcomes.len(), 3);

    assert!(outcome.outcomes[&fid("f1")].is_success());
    assert!(matches!(
        outcome.outcomes[&fid("f2")],
        BatchItemOutcome::Failed(_)
    ));
    assert!(outcome.outcomes[&fid("f3")].is_success());

    assert_eq!(
        engine.get_processing_status(&fid("f1")),
        Some(ProcessingStatus::Processed)
    );
    assert_eq!(
        engine.get_processing_status(&fid("f2")),
        Some(ProcessingStatus::Error)
    );
    assert_eq!(
        engine.get_processing_status(&fid("f3")),
        Some(ProcessingStatus::Processed)
    );
}

#[tokio::test]
async fn a_single_file_applies_to_every_selected_field() {
    let backend = Arc::new(MockBackend::new());
    let engine = engine_with_three_fields(Arc::clone(&backend)).await;

    let outcome = engine
        .begin_batch_upload(
            vec![fid("f1"), fid("f2"), fid("f3")],
            vec![kml_file("shared.kml", 10)],
        )
        .await;

    assert_eq!(outcome.attempted, 3);
    assert_eq!(outcome.succeeded, 3);
    assert_eq!(backend.upload_calls.lock().len(), 3);
}

#[tokio::test]
async fn unmatched_fields_are_reported_as_skipped() {
    let backend = Arc::new(MockBackend::new());
    let engine = engine_with_three_fields(Arc::clone(&backend)).await;

    let outcome = engine
        .begin_batch_upload(
            vec![fid("f1"), fid("f2"), fid("f3")],
            vec![kml_file("a.kml", 10), kml_file("b.kml", 10)],
        )
        .await;

    assert_eq!(outcome.attempted, 2);
    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed, 0);
    assert!(matches!(
        outcome.outcomes[&fid("f3")],
        BatchItemOutcome::Skipped { .. }
    ));
    // The skipped field never moved.
    assert_eq!(
        engine.get_processing_status(&fid("f3")),
        Some(ProcessingStatus::AwaitingGeometry)
    );
}

#[tokio::test]
async fn precondition_failures_count_as_field_failures_not_batch_failures() {
    let backend = Arc::new(MockBackend::new());
    let engine = engine_with_three_fields(Arc::clone(&backend)).await;

    let outcome = engine
        .begin_batch_upload(
            vec![fid("f1"), fid("f2")],
            vec![
                kml_file("ok.kml", 10),
                kml_file("too-big.kml", 2 * 1024 * 1024),
            ],
        )
        .await;

    assert_eq!(outcome.attempted, 2);
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.failed, 1);
    // The oversized file was rejected before any state change.
    assert_eq!(
        engine.get_processing_status(&fid("f2")),
        Some(ProcessingStatus::AwaitingGeometry)
    );
}

#[tokio::test]
async fn selection_is_cleared_only_after_the_batch_completes() {
    let backend = Arc::new(MockBackend::new());
    backend
        .upload_delay_ms
        .store(100, std::sync::atomic::Ordering::SeqCst);
    let engine = Arc::new(engine_with_three_fields(Arc::clone(&backend)).await);

    let batch = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .begin_batch_upload(
                    vec![fid("f1"), fid("f2")],
                    vec![kml_file("a.kml", 10), kml_file("b.kml", 10)],
                )
                .await
        })
    };

    // Mid-batch the selection is still present.
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    assert_eq!(engine.selected_fields().len(), 2);

    let outcome = batch.await.unwrap();
    assert_eq!(outcome.succeeded, 2);
    assert!(engine.selected_fields().is_empty());
}

#[tokio::test]
async fn the_index_is_current_the_moment_the_batch_reports() {
    let backend = Arc::new(MockBackend::new());
    backend.script_upload(
        "f1",
        UploadScript::Succeed(json!({
            "boundary": { "type": "Polygon", "coordinates": [[[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]] }
        })),
    );
    let engine = engine_with_three_fields(Arc::clone(&backend)).await;

    let outcome = engine
        .begin_batch_upload(vec![fid("f1")], vec![kml_file("f1.kml", 10)])
        .await;
    assert!(outcome.outcomes[&fid("f1")].is_success());

    // Re-reading the index immediately after the report sees the result.
    let field = engine
        .get_fields_for_farmer("farmer-a")
        .into_iter()
        .find(|f| f.id.as_str() == "f1")
        .unwrap();
    assert_eq!(field.processing_status, ProcessingStatus::Processed);
    assert!(field.boundary.unwrap().has_coordinates());
}
