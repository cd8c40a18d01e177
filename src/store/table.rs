//! RecordStore implementation
//!
//! BTreeMap-based store with a single RwLock for concurrency.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{DocStoreError, Result};
use crate::wal::Operation;

use super::{generate_id, matches_filter, sort_by_key, Collection, Filter, Record, ID_FIELD};

/// In-memory document store
///
/// ## Concurrency:
/// - `collections`: one RwLock over the whole store
/// - Readers (`find`, `count`, `sort`, `serialize`) share the lock
/// - `apply` and `deserialize` take it exclusively
/// - All methods use `&self`
pub struct RecordStore {
    /// collection name → id → record
    collections: RwLock<BTreeMap<String, Collection>>,
}

impl RecordStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
        }
    }

    /// Apply one operation (write lock)
    ///
    /// Never fails. The target collection is created if it does not exist.
    /// Returns the number of records inserted, updated, or removed.
    pub fn apply(&self, operation: Operation) -> usize {
        let mut collections = self.collections.write();

        match operation {
            Operation::Insert { collection, mut record, id } => {
                let id = match id {
                    Some(id) if !id.is_empty() => id,
                    _ => generate_id(),
                };
                record.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                collections.entry(collection).or_default().insert(id, record);
                1
            }
            Operation::Update { collection, filter, patch } => {
                let target = collections.entry(collection).or_default();
                let mut matched = 0;
                for record in target.values_mut() {
                    if matches_filter(record, &filter) {
                        merge_patch(record, &patch);
                        matched += 1;
                    }
                }
                matched
            }
            Operation::Delete { collection, filter } => {
                let target = collections.entry(collection).or_default();
                let before = target.len();
                target.retain(|_, record| !matches_filter(record, &filter));
                before - target.len()
            }
        }
    }

    /// All records in `collection` matching `filter` (read lock)
    pub fn find(&self, collection: &str, filter: &Filter) -> Vec<Record> {
        let collections = self.collections.read();
        match collections.get(collection) {
            Some(records) => records
                .values()
                .filter(|record| matches_filter(record, filter))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of records matching `filter`; 0 for an unknown collection
    pub fn count(&self, collection: &str, filter: &Filter) -> usize {
        let collections = self.collections.read();
        match collections.get(collection) {
            Some(records) if filter.is_empty() => records.len(),
            Some(records) => records
                .values()
                .filter(|record| matches_filter(record, filter))
                .count(),
            None => 0,
        }
    }

    /// Every record in `collection` ordered by the value at `key`
    pub fn sort(&self, collection: &str, key: &str) -> Vec<Record> {
        let records = {
            let collections = self.collections.read();
            match collections.get(collection) {
                Some(records) => records.values().cloned().collect(),
                None => return Vec::new(),
            }
        };
        sort_by_key(records, key)
    }

    /// Fetch one record by id
    pub fn get(&self, collection: &str, id: &str) -> Option<Record> {
        self.collections.read().get(collection)?.get(id).cloned()
    }

    /// Names of all collections, sorted
    pub fn collection_names(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }

    /// Total number of records across all collections
    pub fn record_count(&self) -> usize {
        self.collections.read().values().map(|c| c.len()).sum()
    }

    /// Check if the store holds no records
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Export the full state as JSON: collection → id → record
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let collections = self.collections.read();
        serde_json::to_vec(&*collections)
            .map_err(|e| DocStoreError::Serialization(format!("store export failed: {}", e)))
    }

    /// Replace the full state with a previously serialized one
    ///
    /// The payload is parsed and checked before the write lock is taken, so
    /// on error the current state is untouched and readers never observe a
    /// partial replacement. Returns the number of records loaded.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<usize> {
        let mut parsed: BTreeMap<String, Collection> = serde_json::from_slice(bytes)
            .map_err(|e| DocStoreError::Serialization(format!("store import failed: {}", e)))?;

        let mut loaded = 0;
        for (name, records) in parsed.iter_mut() {
            for (id, record) in records.iter_mut() {
                if id.is_empty() {
                    return Err(DocStoreError::Serialization(format!(
                        "record with empty id in collection '{}'",
                        name
                    )));
                }
                record.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                loaded += 1;
            }
        }

        *self.collections.write() = parsed;
        Ok(loaded)
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Shallow merge: each patch field overwrites the record's field.
/// `_id` is immutable and never patched.
fn merge_patch(record: &mut Record, patch: &Record) {
    for (field, value) in patch {
        if field == ID_FIELD {
            continue;
        }
        record.insert(field.clone(), value.clone());
    }
}
