// src/index.rs
//! The farmer → fields index.
//!
//! A read-through view over the store: `get` answers from the populated
//! view when it can, and `ensure` populates on demand — embedded field
//! lists first, catalog filtering second (exact owner match, then the
//! suffix heuristic). Lookups tolerate the key-format variation the
//! backend exhibits; a resolved variant is aliased to the canonical key so
//! the next lookup is direct.

use crate::model::Field;
use crate::store::FieldStore;
use crate::types::{FarmerId, IdMatch};
use dashmap::DashMap;
use std::sync::Arc;

pub struct FarmerFieldIndex {
    store: Arc<FieldStore>,
    /// Raw key variant → canonical farmer id, learned from past lookups.
    aliases: DashMap<String, FarmerId>,
}

impl FarmerFieldIndex {
    pub fn new(store: Arc<FieldStore>) -> Self {
        Self {
            store,
            aliases: DashMap::new(),
        }
    }

    /// Looks up a farmer's ordered field list by a raw key, populating the
    /// entry on demand when the view has nothing for it yet.
    pub fn get(&self, raw_key: &str) -> Vec<Field> {
        match self.resolve_key(raw_key) {
            Some(farmer_id) => self.ensure(&farmer_id),
            None => {
                log::debug!("no farmer resolves from key '{}'", raw_key);
                vec![]
            }
        }
    }

    /// Returns the field list for a farmer, populating it if needed.
    ///
    /// Population order: the embedded list on the farmer record, then the
    /// catalog filtered by owner (exact match, then the suffix heuristic).
    /// A best-effort source returning nothing never shrinks an already
    /// populated entry — the store's bind path enforces that invariant.
    pub fn ensure(&self, farmer_id: &FarmerId) -> Vec<Field> {
        if self.store.has_populated_entry(farmer_id) {
            return self.store.fields_for_farmer(farmer_id);
        }

        if let Some(farmer) = self.store.farmer(farmer_id) {
            if !farmer.embedded_fields.is_empty() {
                log::debug!(
                    "populating farmer {} from {} embedded fields",
                    farmer_id,
                    farmer.embedded_fields.len()
                );
                self.store
                    .bind_fields_to_farmer(farmer_id, farmer.embedded_fields);
                return self.store.fields_for_farmer(farmer_id);
            }
        }

        let matched = self.filter_catalog(farmer_id);
        if !matched.is_empty() {
            log::debug!(
                "populating farmer {} from {} catalog matches",
                farmer_id,
                matched.len()
            );
            self.store.bind_fields_to_farmer(farmer_id, matched);
        }
        self.store.fields_for_farmer(farmer_id)
    }

    /// Filters the catalog by owner: exact matches when any exist,
    /// otherwise suffix-heuristic matches (logged by the comparator).
    fn filter_catalog(&self, farmer_id: &FarmerId) -> Vec<Field> {
        let catalog = self.store.all_fields();
        let exact: Vec<Field> = catalog
            .iter()
            .filter(|f| {
                f.owner
                    .as_ref()
                    .map(|o| o.matches(farmer_id.as_str()) == IdMatch::Exact)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        if !exact.is_empty() {
            return exact;
        }
        catalog
            .into_iter()
            .filter(|f| {
                f.owner
                    .as_ref()
                    .map(|o| o.matches(farmer_id.as_str()).is_match())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Resolves a raw lookup key to a canonical farmer id, trying the key
    /// as given, then trimmed. A hit through a variant is copied to the
    /// alias table so future lookups resolve directly.
    fn resolve_key(&self, raw_key: &str) -> Option<FarmerId> {
        if let Some(alias) = self.aliases.get(raw_key) {
            return Some(alias.clone());
        }

        for candidate in [raw_key, raw_key.trim()] {
            if candidate.is_empty() {
                continue;
            }
            if let Some(farmer_id) = self.known_farmer(candidate) {
                if candidate != raw_key || farmer_id.as_str() != raw_key {
                    self.aliases.insert(raw_key.to_string(), farmer_id.clone());
                }
                return Some(farmer_id);
            }
        }

        // Unknown farmer: accept the trimmed key as canonical so catalog
        // filtering can still run against it.
        FarmerId::from_raw(raw_key).ok()
    }

    /// Finds a known farmer whose canonical id matches the candidate key.
    fn known_farmer(&self, candidate: &str) -> Option<FarmerId> {
        self.store
            .farmers()
            .into_iter()
            .map(|farmer| farmer.id)
            .find(|id| id.as_str() == candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventHub;
    use crate::model::{Farmer, ProcessingStatus};
    use crate::types::FieldId;

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

    fn farmer(id: &str, embedded: Vec<Field>) -> Farmer {
        Farmer {
            id: FarmerId::from_raw(id).unwrap(),
            display_name: "Test Farmer".into(),
            location: "Unknown".into(),
            embedded_fields: embedded,
        }
    }

    fn setup() -> (Arc<FieldStore>, FarmerFieldIndex) {
        let store = Arc::new(FieldStore::new(EventHub::new()));
        let index = FarmerFieldIndex::new(Arc::clone(&store));
        (store, index)
    }

    #[test]
    fn embedded_list_populates_before_catalog_filtering() {
        let (store, index) = setup();
        store.upsert_farmers(vec![farmer(
            "farmer-a",
            vec![field("f1", Some("farmer-a"))],
        )]);
        store.replace_catalog(vec![field("f9", Some("farmer-a"))]);
        // The view built from the catalog is already populated, so the
        // catalog copy wins; drop it to exercise the embedded path.
        let (store2, index2) = setup();
        store2.upsert_farmers(vec![farmer(
            "farmer-a",
            vec![field("f1", Some("farmer-a"))],
        )]);
        let fields = index2.ensure(&FarmerId::from_raw("farmer-a").unwrap());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].id.as_str(), "f1");

        // And with a populated catalog view, ensure returns that instead.
        let fields = index.ensure(&FarmerId::from_raw("farmer-a").unwrap());
        assert_eq!(fields[0].id.as_str(), "f9");
    }

    #[test]
    fn catalog_filtering_prefers_exact_owner_matches() {
        let (store, index) = setup();
        store.upsert_farmers(vec![farmer("farmer-abc123456", vec![])]);
        store.replace_catalog(vec![
            field("f1", Some("farmer-abc123456")),
            field("f2", Some("other-xyz123456")),
        ]);
        let fields = index.ensure(&FarmerId::from_raw("farmer-abc123456").unwrap());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].id.as_str(), "f1");
    }

    #[test]
    fn suffix_heuristic_applies_only_without_exact_matches() {
        let (store, index) = setup();
        store.upsert_farmers(vec![farmer("abc123456", vec![])]);
        // Owner id differs in encoding but shares the 6-char suffix.
        store.replace_catalog(vec![field("f1", Some("enc:abc123456"))]);
        let fields = index.ensure(&FarmerId::from_raw("abc123456").unwrap());
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn populated_entry_survives_empty_embedded_recheck() {
        let (store, index) = setup();
        store.upsert_farmers(vec![farmer("farmer-a", vec![])]);
        store.replace_catalog(vec![
            field("f1", Some("farmer-a")),
            field("f2", Some("farmer-a")),
            field("f3", Some("farmer-a")),
        ]);
        let farmer_id = FarmerId::from_raw("farmer-a").unwrap();
        assert_eq!(index.get("farmer-a").len(), 3);

        // The farmer record's embedded list is empty; a re-ensure must not
        // shrink the populated entry.
        let fields = index.ensure(&farmer_id);
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn key_variants_resolve_and_alias() {
        let (store, index) = setup();
        store.upsert_farmers(vec![farmer("farmer-a", vec![])]);
        store.replace_catalog(vec![field("f1", Some("farmer-a"))]);
        assert_eq!(index.get("  farmer-a  ").len(), 1);
        // Second lookup hits the alias table.
        assert_eq!(index.get("  farmer-a  ").len(), 1);
    }

    #[test]
    fn unknown_key_returns_empty_without_error() {
        let (_store, index) = setup();
        assert!(index.get("nobody").is_empty());
        assert!(index.get("   ").is_empty());
    }
}
