//! WAL Entry definitions
//!
//! Defines the operations that are logged and how each becomes one line of
//! the log file.

use serde::{Deserialize, Serialize};

use crate::error::{DocStoreError, Result};
use crate::store::{Filter, Record};

/// Terminates every WAL record
pub const RECORD_DELIMITER: u8 = b'\n';

/// Operations that can be logged
///
/// Serialized as a JSON object tagged by `op`:
/// ```text
/// {"op":"insert","collection":"users","record":{"name":"Ana"},"id":"9f1c…"}
/// {"op":"update","collection":"users","filter":{"name":"Ana"},"patch":{"age":30}}
/// {"op":"delete","collection":"users","filter":{"age":30}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    /// Insert a record; `id` is assigned before logging so replay is deterministic
    Insert {
        collection: String,
        record: Record,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Merge `patch` into every record matching `filter`
    Update {
        collection: String,
        filter: Filter,
        patch: Record,
    },

    /// Remove every record matching `filter`
    Delete { collection: String, filter: Filter },
}

impl Operation {
    /// Target collection name
    pub fn collection(&self) -> &str {
        match self {
            Operation::Insert { collection, .. }
            | Operation::Update { collection, .. }
            | Operation::Delete { collection, .. } => collection,
        }
    }

    /// Operation tag as written to the log
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Insert { .. } => "insert",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
        }
    }

    /// Serialize into a single delimited log record
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec(self).map_err(|e| {
            DocStoreError::Serialization(format!("failed to encode {} operation: {}", self.kind(), e))
        })?;
        bytes.push(RECORD_DELIMITER);
        Ok(bytes)
    }

    /// Parse one log record (with or without its delimiter)
    pub fn decode(line: &[u8]) -> Result<Self> {
        let line = line.strip_suffix(&[RECORD_DELIMITER]).unwrap_or(line);
        serde_json::from_slice(line)
            .map_err(|e| DocStoreError::WalCorruption(format!("undecodable record: {}", e)))
    }
}
