//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append each accepted operation before it touches the store
//! - fsync per the configured sync strategy
//! - Truncate after a snapshot subsumes the log
//! - Scan the log record by record for recovery
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ {"op":"insert","collection":"users","record":{..},"id":..}\n
//! │ {"op":"update","collection":"users","filter":{..},"patch":{..}}\n
//! │ {"op":"delete","collection":"users","filter":{..}}\n
//! │ {"op":"insert","coll                  ← torn tail, no '\n'
//! └──────────────────────────────────────────────────────────┘
//! ```
//! A record is complete only once its delimiter is on disk. An undelimited
//! tail is dropped by recovery; a delimited line that fails to decode is
//! skipped with a warning.

mod entry;
mod reader;
mod writer;

pub use entry::{Operation, RECORD_DELIMITER};
pub use reader::{WalReader, WalRecord};
pub use writer::WalWriter;
