// src/upload/batch.rs
//! Batch boundary uploads.
//!
//! Fans out N independent per-field uploads concurrently and reports every
//! outcome. This is an embarrassingly-parallel batch, not a transaction:
//! one field's failure neither cancels nor blocks its siblings, and there
//! is no all-or-nothing semantics to roll back.

use super::{BoundaryFile, UploadOutcome, UploadSupervisor};
use crate::error::UploadError;
use crate::types::FieldId;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

/// Per-field result inside a batch.
#[derive(Debug, Clone)]
pub enum BatchItemOutcome {
    /// The upload ran and succeeded.
    Succeeded(UploadOutcome),
    /// The upload ran (or was rejected by a precondition) and failed.
    Failed(UploadError),
    /// The field was never attempted — no file paired with it.
    Skipped { reason: String },
}

impl BatchItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchItemOutcome::Succeeded(_))
    }
}

/// Aggregate result of a batch upload.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Correlation id tying this batch's log lines together.
    pub batch_id: Uuid,
    /// Uploads actually launched (skipped fields are not attempts).
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Per-field outcomes in selection order, every selected field present.
    pub outcomes: IndexMap<FieldId, BatchItemOutcome>,
}

/// Fans batches of uploads out through the supervisor.
pub struct BatchUploadCoordinator {
    supervisor: Arc<UploadSupervisor>,
}

impl BatchUploadCoordinator {
    pub fn new(supervisor: Arc<UploadSupervisor>) -> Self {
        Self { supervisor }
    }

    /// Uploads boundary files for the selected fields concurrently.
    ///
    /// Pairing policy: exactly one file for multiple fields applies that
    /// file to all of them; otherwise files pair to fields by enumeration
    /// order. Fields left without a file are reported as skipped; surplus
    /// files are ignored with a warning.
    pub async fn process_many(
        &self,
        field_ids: Vec<FieldId>,
        files: Vec<BoundaryFile>,
    ) -> BatchOutcome {
        let batch_id = Uuid::new_v4();
        log::info!(
            "batch {}: {} fields, {} files",
            batch_id,
            field_ids.len(),
            files.len()
        );

        let pairs = pair_files_to_fields(&field_ids, files);

        let mut join_set: JoinSet<(FieldId, Result<UploadOutcome, UploadError>)> = JoinSet::new();
        let mut results: IndexMap<FieldId, BatchItemOutcome> = IndexMap::new();
        let mut attempted = 0usize;

        for (field_id, file) in pairs {
            match file {
                Some(file) => {
                    attempted += 1;
                    let supervisor = Arc::clone(&self.supervisor);
                    let id = field_id.clone();
                    join_set.spawn(async move {
                        let outcome = supervisor.begin_upload(&id, &file, None).await;
                        (id, outcome)
                    });
                }
                None => {
                    log::warn!(
                        "batch {}: field {} has no paired file; skipping",
                        batch_id,
                        field_id
                    );
                    results.insert(
                        field_id,
                        BatchItemOutcome::Skipped {
                            reason: "no boundary file paired with this field".to_string(),
                        },
                    );
                }
            }
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((field_id, Ok(outcome))) => {
                    results.insert(field_id, BatchItemOutcome::Succeeded(outcome));
                }
                Ok((field_id, Err(e))) => {
                    results.insert(field_id, BatchItemOutcome::Failed(e));
                }
                Err(join_error) => {
                    // A panicked task lost its field id; this should not
                    // happen and is surfaced loudly in the log.
                    log::error!("batch {}: upload task failed to join: {}", batch_id, join_error);
                }
            }
        }

        // Report in selection order regardless of completion order.
        let mut outcomes: IndexMap<FieldId, BatchItemOutcome> = IndexMap::new();
        for field_id in &field_ids {
            if let Some(outcome) = results.swap_remove(field_id) {
                outcomes.insert(field_id.clone(), outcome);
            }
        }

        let succeeded = outcomes.values().filter(|o| o.is_success()).count();
        let failed = outcomes
            .values()
            .filter(|o| matches!(o, BatchItemOutcome::Failed(_)))
            .count();

        log::info!(
            "batch {}: {} attempted, {} succeeded, {} failed",
            batch_id,
            attempted,
            succeeded,
            failed
        );

        BatchOutcome {
            batch_id,
            attempted,
            succeeded,
            failed,
            outcomes,
        }
    }
}

/// Pairs files to fields per the batch pairing policy.
fn pair_files_to_fields(
    field_ids: &[FieldId],
    files: Vec<BoundaryFile>,
) -> Vec<(FieldId, Option<BoundaryFile>)> {
    if files.len() == 1 && field_ids.len() > 1 {
        let file = &files[0];
        return field_ids
            .iter()
            .map(|id| (id.clone(), Some(file.clone())))
            .collect();
    }
    if files.len() > field_ids.len() {
        log::warn!(
            "{} files supplied for {} fields; ignoring the surplus",
            files.len(),
            field_ids.len()
        );
    }
    let mut files = files.into_iter();
    field_ids
        .iter()
        .map(|id| (id.clone(), files.next()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<FieldId> {
        raw.iter().map(|r| FieldId::from_raw(*r).unwrap()).collect()
    }

    #[test]
    fn one_file_fans_out_to_all_fields() {
        let pairs = pair_files_to_fields(
            &ids(&["f1", "f2", "f3"]),
            vec![BoundaryFile::new("a.kml", vec![1])],
        );
        assert_eq!(pairs.len(), 3);
        assert!(pairs.iter().all(|(_, file)| file.is_some()));
    }

    #[test]
    fn files_pair_by_enumeration_order() {
        let pairs = pair_files_to_fields(
            &ids(&["f1", "f2"]),
            vec![
                BoundaryFile::new("a.kml", vec![1]),
                BoundaryFile::new("b.kml", vec![2]),
            ],
        );
        assert_eq!(pairs[0].1.as_ref().unwrap().file_name(), "a.kml");
        assert_eq!(pairs[1].1.as_ref().unwrap().file_name(), "b.kml");
    }

    #[test]
    fn unmatched_fields_get_no_file() {
        let pairs = pair_files_to_fields(
            &ids(&["f1", "f2", "f3"]),
            vec![
                BoundaryFile::new("a.kml", vec![1]),
                BoundaryFile::new("b.kml", vec![2]),
            ],
        );
        assert!(pairs[2].1.is_none());
    }

    #[test]
    fn single_field_single_file_pairs_directly() {
        let pairs = pair_files_to_fields(&ids(&["f1"]), vec![BoundaryFile::new("a.kml", vec![1])]);
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].1.is_some());
    }
}
