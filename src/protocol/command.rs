//! Request definitions
//!
//! Represents operations and queries submitted to the database.

use crate::error::{DocStoreError, Result};
use crate::store::{Filter, Record, ID_FIELD};

/// Request types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Insert,
    Find,
    Update,
    Delete,
    Count,
    Sort,
    ListCollections,
    SaveSnapshot,
}

/// A parsed request
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Insert a record; the database assigns its `_id`
    Insert { collection: String, record: Record },

    /// Find records matching a filter
    Find { collection: String, filter: Filter },

    /// Merge a patch into every record matching a filter
    Update {
        collection: String,
        filter: Filter,
        patch: Record,
    },

    /// Delete records matching a filter
    Delete { collection: String, filter: Filter },

    /// Count records matching a filter
    Count { collection: String, filter: Filter },

    /// All records of a collection ordered by one field
    Sort { collection: String, key: String },

    /// Names of all collections
    ListCollections,

    /// Snapshot the store and truncate the WAL
    SaveSnapshot,
}

impl Request {
    /// Get the request type
    pub fn request_type(&self) -> RequestType {
        match self {
            Request::Insert { .. } => RequestType::Insert,
            Request::Find { .. } => RequestType::Find,
            Request::Update { .. } => RequestType::Update,
            Request::Delete { .. } => RequestType::Delete,
            Request::Count { .. } => RequestType::Count,
            Request::Sort { .. } => RequestType::Sort,
            Request::ListCollections => RequestType::ListCollections,
            Request::SaveSnapshot => RequestType::SaveSnapshot,
        }
    }

    /// Whether executing this request changes the store
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Request::Insert { .. } | Request::Update { .. } | Request::Delete { .. }
        )
    }

    /// Reject malformed input before anything is logged
    pub fn validate(&self) -> Result<()> {
        match self {
            Request::Insert { collection, record } => {
                validate_collection(collection)?;
                reject_id_field(record, "insert record")
            }
            Request::Update {
                collection, patch, ..
            } => {
                validate_collection(collection)?;
                reject_id_field(patch, "update patch")
            }
            Request::Find { collection, .. }
            | Request::Delete { collection, .. }
            | Request::Count { collection, .. } => validate_collection(collection),
            Request::Sort { collection, key } => {
                validate_collection(collection)?;
                if key.is_empty() {
                    return Err(DocStoreError::InvalidInput("sort key is empty".to_string()));
                }
                Ok(())
            }
            Request::ListCollections | Request::SaveSnapshot => Ok(()),
        }
    }
}

/// Collection names must contain a non-whitespace character
pub(crate) fn validate_collection(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DocStoreError::InvalidInput(
            "collection name is empty".to_string(),
        ));
    }
    Ok(())
}

/// `_id` belongs to the store; callers may not set or patch it
pub(crate) fn reject_id_field(record: &Record, what: &str) -> Result<()> {
    if record.contains_key(ID_FIELD) {
        return Err(DocStoreError::InvalidInput(format!(
            "{} may not set `{}`; it is assigned by the store",
            what, ID_FIELD
        )));
    }
    Ok(())
}
