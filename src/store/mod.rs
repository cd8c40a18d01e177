//! Record Store Module
//!
//! In-memory engine that owns every live record.
//!
//! ## Responsibilities
//! - Apply logged operations (insert/update/delete) deterministically
//! - Answer queries (find/count/sort) under a shared read lock
//! - Export and import the full state for snapshots
//!
//! ## Data Structure Choice
//! Using BTreeMap wrapped in a single RwLock:
//! - One lock for the whole store: `apply` is atomic across all fields it
//!   touches, readers never see a half-applied operation
//! - Ordered maps make snapshots byte-for-byte reproducible
//! - Every filter is a full scan of the collection; there are no indexes
//!
//! ```text
//! store
//!  └── "users"                      (collection name)
//!       ├── "9f1c…" → { "_id": "9f1c…", "name": "Ana" }
//!       └── "b27e…" → { "_id": "b27e…", "name": "Bo", "age": 30 }
//! ```

mod filter;
mod ordering;
mod table;

use std::collections::BTreeMap;

use serde_json::{Map, Value};

pub use filter::{matches_filter, values_equal};
pub use ordering::{compare_values, sort_by_key};
pub use table::RecordStore;

/// Reserved field holding a record's identifier
pub const ID_FIELD: &str = "_id";

/// A schemaless record: field name → JSON value
pub type Record = Map<String, Value>;

/// Conjunctive field-equality predicate; empty matches everything
pub type Filter = Map<String, Value>;

/// Records of one collection, keyed by `_id`
pub type Collection = BTreeMap<String, Record>;

/// Generate a fresh record identifier
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
