//! # DocStore
//!
//! An embedded document store with:
//! - Schemaless JSON records grouped into collections
//! - Write-Ahead Logging (WAL) for durability
//! - Snapshots with atomic replacement and WAL compaction
//! - Crash recovery that tolerates torn and corrupt log records
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   CLI / REPL (adapter)                       │
//! │              text → Request, Response → text                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Database::execute                           │
//! │            (Single Writer / Multi Reader)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │ 1. append               │ 2. apply
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │ RecordStore │
//!   │  (Append)   │          │  (RwLock)   │
//!   └──────┬──────┘          └──────┬──────┘
//!          │ truncate               │ save
//!          └───────────┬────────────┘
//!                      ▼
//!               ┌─────────────┐
//!               │  Snapshot   │
//!               │ (tmp+rename)│
//!               └─────────────┘
//! ```
//!
//! On startup `Recovery` loads the snapshot and replays the WAL before the
//! `Database` handle is returned.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod wal;
pub mod snapshot;
pub mod recovery;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DocStoreError, Result};
pub use config::Config;
pub use engine::Database;
pub use protocol::{Request, Response};
pub use store::{Filter, Record};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of DocStore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
