//! Response definitions
//!
//! Represents results returned to callers.

use crate::store::Record;

/// A response to a request
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Record inserted under this id
    Inserted { id: String },

    /// Number of records the update matched
    Updated { matched: usize },

    /// Number of records removed
    Deleted { removed: usize },

    /// Records returned by find or sort
    Records(Vec<Record>),

    /// Result of count
    Count(usize),

    /// Collection names
    Collections(Vec<String>),

    /// Snapshot committed; `wal_truncated` is false if truncation failed
    SnapshotSaved { wal_truncated: bool },
}

impl Response {
    /// Records carried by this response, if any
    pub fn records(&self) -> Option<&[Record]> {
        match self {
            Response::Records(records) => Some(records),
            _ => None,
        }
    }

    /// Consume the response, returning its records
    pub fn into_records(self) -> Option<Vec<Record>> {
        match self {
            Response::Records(records) => Some(records),
            _ => None,
        }
    }
}
