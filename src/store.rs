// src/store.rs
//! The single authoritative field store.
//!
//! Every field lives here exactly once, keyed by id; the per-farmer index
//! and the "selected field" reference are derived views over this map, so
//! there are no redundant copies to drift apart. Every mutation — fetch
//! ingestion, upload responses, reclassification — flows through
//! [`FieldStore::apply_field_update`] or one of the two ingestion paths;
//! nothing else writes.

use crate::events::EventHub;
use crate::model::{Farmer, Field, FieldPatch, ProcessingStatus};
use crate::types::{FarmerId, FieldId};
use indexmap::IndexMap;
use parking_lot::RwLock;

#[derive(Default)]
struct StoreInner {
    fields: IndexMap<FieldId, Field>,
    farmers: IndexMap<FarmerId, Farmer>,
    /// Derived view: farmer → ordered field ids. Rebuilt on catalog refresh,
    /// extended by on-demand index population.
    by_farmer: IndexMap<FarmerId, Vec<FieldId>>,
}

/// Thread-safe store plus the event hub it reports mutations through.
pub struct FieldStore {
    inner: RwLock<StoreInner>,
    events: EventHub,
}

impl FieldStore {
    pub fn new(events: EventHub) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            events,
        }
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    // -----------------------------------------------------------------
    // Ingestion paths
    // -----------------------------------------------------------------

    /// Replaces the catalog with a freshly fetched field list.
    ///
    /// This is the only operation allowed to shrink a farmer's field list:
    /// a full fetch is explicit confirmation, unlike the best-effort
    /// embedded-list checks. Fields with an upload in flight keep their
    /// `Processing` status — the upload owns the lifecycle until it
    /// resolves — and retained error messages survive the refresh.
    pub fn replace_catalog(&self, fields: Vec<Field>) {
        let mut changed_farmers: Vec<FarmerId> = Vec::new();
        {
            let mut inner = self.inner.write();

            let mut new_fields: IndexMap<FieldId, Field> = IndexMap::with_capacity(fields.len());
            for mut field in fields {
                if let Some(existing) = inner.fields.get(&field.id) {
                    if existing.processing_status == ProcessingStatus::Processing {
                        field.processing_status = ProcessingStatus::Processing;
                    }
                    if field.last_error.is_none() {
                        field.last_error = existing.last_error.clone();
                    }
                }
                new_fields.insert(field.id.clone(), field);
            }

            let old_view = std::mem::take(&mut inner.by_farmer);
            inner.fields = new_fields;

            let mut new_view: IndexMap<FarmerId, Vec<FieldId>> = IndexMap::new();
            for (id, field) in &inner.fields {
                if let Some(owner) = &field.owner {
                    new_view.entry(owner.clone()).or_default().push(id.clone());
                }
            }

            for (farmer, ids) in &new_view {
                if old_view.get(farmer) != Some(ids) {
                    changed_farmers.push(farmer.clone());
                }
            }
            for farmer in old_view.keys() {
                if !new_view.contains_key(farmer) {
                    changed_farmers.push(farmer.clone());
                }
            }

            inner.by_farmer = new_view;
        }

        for farmer in changed_farmers {
            self.events.emit_index_changed(farmer);
        }
    }

    /// Stores farmer records from an assigned-farmers fetch. Field data
    /// embedded on the farmers is not ingested here — the index decides
    /// when an embedded list may populate a view entry.
    pub fn upsert_farmers(&self, farmers: Vec<Farmer>) {
        let mut inner = self.inner.write();
        for farmer in farmers {
            inner.farmers.insert(farmer.id.clone(), farmer);
        }
    }

    /// Binds a field list to a farmer's view entry, inserting any fields
    /// not yet in the store.
    ///
    /// Refuses to overwrite a populated entry with an empty list: only
    /// [`FieldStore::replace_catalog`] may legitimately shrink one. Returns
    /// whether the view entry changed.
    pub fn bind_fields_to_farmer(&self, farmer_id: &FarmerId, fields: Vec<Field>) -> bool {
        let changed = {
            let mut inner = self.inner.write();
            let existing_len = inner
                .by_farmer
                .get(farmer_id)
                .map(|ids| ids.len())
                .unwrap_or(0);
            if fields.is_empty() && existing_len > 0 {
                log::debug!(
                    "refusing to shrink populated field list for farmer {} ({} fields) from a best-effort source",
                    farmer_id,
                    existing_len
                );
                return false;
            }
            if fields.is_empty() {
                return false;
            }

            let ids: Vec<FieldId> = fields.iter().map(|f| f.id.clone()).collect();
            for field in fields {
                // A catalog copy is authoritative over an embedded one;
                // only fill holes.
                inner
                    .fields
                    .entry(field.id.clone())
                    .or_insert(field);
            }
            let previous = inner.by_farmer.insert(farmer_id.clone(), ids.clone());
            previous.as_ref() != Some(&ids)
        };

        if changed {
            self.events.emit_index_changed(farmer_id.clone());
        }
        changed
    }

    // -----------------------------------------------------------------
    // The single write path
    // -----------------------------------------------------------------

    /// Applies a partial update to a field — the one write path every
    /// component that learns new field data must use.
    ///
    /// A missing target is tolerated (skip, not fail) so a late upload
    /// completion after a catalog shrink never errors; it is logged.
    /// Returns the (old, new) status pair when the update changed status.
    pub fn apply_field_update(
        &self,
        id: &FieldId,
        patch: FieldPatch,
    ) -> Option<(ProcessingStatus, ProcessingStatus)> {
        let transition = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;
            let Some(field) = inner.fields.get_mut(id) else {
                log::debug!("apply_field_update: field {} not in store; skipping", id);
                return None;
            };

            let old_status = field.processing_status;
            if let Some(boundary) = patch.boundary {
                field.boundary = Some(boundary);
            }
            if let Some(area) = patch.area_hectares {
                field.area_hectares = Some(area);
            }
            if let Some(status) = patch.backend_status {
                field.backend_status = Some(status);
            }
            if let Some(last_error) = patch.last_error {
                field.last_error = last_error;
            }
            if let Some(location) = patch.location {
                // Location lives on the owning farmer's record.
                if let Some(owner) = field.owner.clone() {
                    if let Some(farmer) = inner.farmers.get_mut(&owner) {
                        farmer.location = location;
                    }
                }
            }
            if let Some(new_status) = patch.processing_status {
                field.processing_status = new_status;
            }
            let new_status = field.processing_status;
            (old_status != new_status).then_some((old_status, new_status))
        };

        if let Some((old_status, new_status)) = transition {
            self.events
                .emit_status_changed(id.clone(), old_status, new_status);
        }
        transition
    }

    // -----------------------------------------------------------------
    // Read views
    // -----------------------------------------------------------------

    pub fn field(&self, id: &FieldId) -> Option<Field> {
        self.inner.read().fields.get(id).cloned()
    }

    pub fn status(&self, id: &FieldId) -> Option<ProcessingStatus> {
        self.inner.read().fields.get(id).map(|f| f.processing_status)
    }

    pub fn farmer(&self, id: &FarmerId) -> Option<Farmer> {
        self.inner.read().farmers.get(id).cloned()
    }

    pub fn farmers(&self) -> Vec<Farmer> {
        self.inner.read().farmers.values().cloned().collect()
    }

    /// Ordered field list for a farmer, from the derived view.
    pub fn fields_for_farmer(&self, id: &FarmerId) -> Vec<Field> {
        let inner = self.inner.read();
        inner
            .by_farmer
            .get(id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|fid| inner.fields.get(fid).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a farmer's view entry is populated with at least one field.
    pub fn has_populated_entry(&self, id: &FarmerId) -> bool {
        self.inner
            .read()
            .by_farmer
            .get(id)
            .map(|ids| !ids.is_empty())
            .unwrap_or(false)
    }

    /// The flat catalog, in ingestion order.
    pub fn all_fields(&self) -> Vec<Field> {
        self.inner.read().fields.values().cloned().collect()
    }

    pub fn field_count(&self) -> usize {
        self.inner.read().fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Boundary;
    use serde_json::json;

    fn field(id: &str, owner: Option<&str>) -> Field {
        Field {
            id: FieldId::from_raw(id).unwrap(),
            owner: owner.map(|o| FarmerId::from_raw(o).unwrap()),
            crop_type: "maize".into(),
            area_hectares: Some(1.0),
            season: "2026A".into(),
            sowing_date: None,
            boundary: None,
            external_file_ref: None,
            backend_status: None,
            processing_status: ProcessingStatus::AwaitingGeometry,
            last_error: None,
        }
    }

    #[test]
    fn replace_catalog_builds_the_farmer_view() {
        let store = FieldStore::new(EventHub::new());
        store.replace_catalog(vec![
            field("f1", Some("farmer-a")),
            field("f2", Some("farmer-a")),
            field("f3", Some("farmer-b")),
            field("f4", None),
        ]);
        let farmer_a = FarmerId::from_raw("farmer-a").unwrap();
        assert_eq!(store.fields_for_farmer(&farmer_a).len(), 2);
        assert_eq!(store.field_count(), 4);
    }

    #[test]
    fn refresh_preserves_in_flight_processing_status() {
        let store = FieldStore::new(EventHub::new());
        store.replace_catalog(vec![field("f1", Some("farmer-a"))]);
        let id = FieldId::from_raw("f1").unwrap();
        store.apply_field_update(&id, FieldPatch::status(ProcessingStatus::Processing));

        store.replace_catalog(vec![field("f1", Some("farmer-a"))]);
        assert_eq!(store.status(&id), Some(ProcessingStatus::Processing));
    }

    #[test]
    fn bind_refuses_to_shrink_populated_entries() {
        let store = FieldStore::new(EventHub::new());
        let farmer = FarmerId::from_raw("farmer-a").unwrap();
        store.replace_catalog(vec![
            field("f1", Some("farmer-a")),
            field("f2", Some("farmer-a")),
            field("f3", Some("farmer-a")),
        ]);
        assert_eq!(store.fields_for_farmer(&farmer).len(), 3);

        assert!(!store.bind_fields_to_farmer(&farmer, vec![]));
        assert_eq!(store.fields_for_farmer(&farmer).len(), 3);
    }

    #[test]
    fn apply_update_reports_status_transitions() {
        let store = FieldStore::new(EventHub::new());
        store.replace_catalog(vec![field("f1", Some("farmer-a"))]);
        let id = FieldId::from_raw("f1").unwrap();

        let transition =
            store.apply_field_update(&id, FieldPatch::status(ProcessingStatus::Processing));
        assert_eq!(
            transition,
            Some((
                ProcessingStatus::AwaitingGeometry,
                ProcessingStatus::Processing
            ))
        );
        // Same status again is not a transition.
        let transition =
            store.apply_field_update(&id, FieldPatch::status(ProcessingStatus::Processing));
        assert_eq!(transition, None);
    }

    #[test]
    fn apply_update_on_missing_field_is_tolerated() {
        let store = FieldStore::new(EventHub::new());
        let id = FieldId::from_raw("ghost").unwrap();
        assert_eq!(
            store.apply_field_update(&id, FieldPatch::status(ProcessingStatus::Processed)),
            None
        );
    }

    #[test]
    fn view_and_catalog_read_the_same_copy() {
        let store = FieldStore::new(EventHub::new());
        store.replace_catalog(vec![field("f1", Some("farmer-a"))]);
        let id = FieldId::from_raw("f1").unwrap();
        let farmer = FarmerId::from_raw("farmer-a").unwrap();

        let boundary =
            Boundary::from_value(&json!([[30.0, -2.0], [30.1, -2.0], [30.1, -2.1]])).unwrap();
        store.apply_field_update(
            &id,
            FieldPatch {
                boundary: Some(boundary.clone()),
                processing_status: Some(ProcessingStatus::Processed),
                ..FieldPatch::default()
            },
        );

        let from_view = &store.fields_for_farmer(&farmer)[0];
        let from_catalog = store.field(&id).unwrap();
        assert_eq!(from_view.boundary, Some(boundary));
        assert_eq!(from_view.boundary, from_catalog.boundary);
        assert_eq!(
            from_view.processing_status,
            from_catalog.processing_status
        );
    }

    #[tokio::test]
    async fn status_transitions_emit_events() {
        let events = EventHub::new();
        let mut rx = events.subscribe();
        let store = FieldStore::new(events);
        store.replace_catalog(vec![field("f1", Some("farmer-a"))]);

        // replace_catalog emitted an index event for farmer-a.
        match rx.recv().await.unwrap() {
            crate::events::EngineEvent::IndexChanged { farmer_id, .. } => {
                assert_eq!(farmer_id.as_str(), "farmer-a");
            }
            other => panic!("unexpected event: {:?}", other),
        }

        let id = FieldId::from_raw("f1").unwrap();
        store.apply_field_update(&id, FieldPatch::status(ProcessingStatus::Processing));
        match rx.recv().await.unwrap() {
            crate::events::EngineEvent::FieldStatusChanged {
                field_id,
                old_status,
                new_status,
                ..
            } => {
                assert_eq!(field_id.as_str(), "f1");
                assert_eq!(old_status, ProcessingStatus::AwaitingGeometry);
                assert_eq!(new_status, ProcessingStatus::Processing);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
