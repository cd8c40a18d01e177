//! Engine Module
//!
//! The database handle that coordinates all components.
//!
//! ## Responsibilities
//! - Run recovery once, before any request is accepted
//! - Log every mutation durably before applying it to the store
//! - Serve queries concurrently from the store
//! - Drive the compaction cycle (snapshot, then WAL truncation)

use std::path::Path;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{reject_id_field, validate_collection, Request, Response};
use crate::recovery::{Recovery, RecoveryResult};
use crate::snapshot::SnapshotManager;
use crate::store::{generate_id, Filter, Record, RecordStore};
use crate::wal::{Operation, WalWriter};

/// The main database handle
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (insert/update/delete/snapshot): serialized by the `wal` mutex
///   - Only ONE write at a time
///   - Order: wal lock → WAL append (+fsync) → store write lock → release
///   - The WAL lock is held until the store has applied the operation, so
///     store order always equals log order
///
/// - **Reads** (find/count/sort): no WAL lock
///   - Store uses one internal RwLock (many concurrent readers)
///   - A record is visible to readers only after its WAL entry is durable
///
/// ## Lifecycle
/// `open` returns only after recovery completed, so a handle is always in
/// the serving state. `close` consumes the handle.
pub struct Database {
    /// Database configuration
    config: Config,

    /// In-memory records (internal RwLock)
    store: RecordStore,

    /// Write-ahead log; its mutex also serializes writers
    wal: Mutex<WalWriter>,

    /// Snapshot file manager
    snapshots: SnapshotManager,

    /// What startup recovery found
    recovery: RecoveryResult,
}

impl Database {
    /// Open or create a database with the given config
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Recover the store from snapshot + WAL
    /// 3. Open the WAL for appending
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let store = RecordStore::new();
        let recovery = Recovery::run(&config, &store);
        let wal = WalWriter::open(&config.log_path, config.wal_sync_strategy)?;
        let snapshots = SnapshotManager::new(&config.snapshot_path);

        tracing::info!(
            "database ready: log={}, snapshot={}, {} collections, {} records",
            config.log_path.display(),
            config.snapshot_path.display(),
            store.collection_names().len(),
            store.record_count()
        );

        Ok(Self {
            config,
            store,
            wal: Mutex::new(wal),
            snapshots,
            recovery,
        })
    }

    /// Open with a log path (convenience method)
    ///
    /// The snapshot path is derived from it: `data.mem` → `data.snap`.
    pub fn connect(log_path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Config::for_log(log_path.as_ref()))
    }

    /// Execute a request
    ///
    /// Validates it, then routes it to the matching handler. Malformed input
    /// is rejected before anything is logged.
    pub fn execute(&self, request: Request) -> Result<Response> {
        request.validate()?;
        tracing::trace!("executing {:?}", request.request_type());

        match request {
            Request::Insert { collection, record } => {
                let id = self.insert(&collection, record)?;
                Ok(Response::Inserted { id })
            }
            Request::Find { collection, filter } => {
                Ok(Response::Records(self.find(&collection, &filter)))
            }
            Request::Update {
                collection,
                filter,
                patch,
            } => {
                let matched = self.update(&collection, filter, patch)?;
                Ok(Response::Updated { matched })
            }
            Request::Delete { collection, filter } => {
                let removed = self.delete(&collection, filter)?;
                Ok(Response::Deleted { removed })
            }
            Request::Count { collection, filter } => {
                Ok(Response::Count(self.count(&collection, &filter)))
            }
            Request::Sort { collection, key } => Ok(Response::Records(self.sort(&collection, &key))),
            Request::ListCollections => Ok(Response::Collections(self.list_collections())),
            Request::SaveSnapshot => {
                let wal_truncated = self.save_snapshot()?;
                Ok(Response::SnapshotSaved { wal_truncated })
            }
        }
    }

    /// Insert a record, returning its assigned id
    ///
    /// The id is generated here, before logging, so WAL replay recreates the
    /// record under the same id.
    pub fn insert(&self, collection: &str, record: Record) -> Result<String> {
        validate_collection(collection)?;
        reject_id_field(&record, "insert record")?;

        let id = generate_id();
        self.commit(Operation::Insert {
            collection: collection.to_string(),
            record,
            id: Some(id.clone()),
        })?;
        Ok(id)
    }

    /// Merge `patch` into every record matching `filter`
    ///
    /// Returns the number of matched records.
    pub fn update(&self, collection: &str, filter: Filter, patch: Record) -> Result<usize> {
        validate_collection(collection)?;
        reject_id_field(&patch, "update patch")?;

        self.commit(Operation::Update {
            collection: collection.to_string(),
            filter,
            patch,
        })
    }

    /// Delete every record matching `filter`
    ///
    /// Returns the number of removed records.
    pub fn delete(&self, collection: &str, filter: Filter) -> Result<usize> {
        validate_collection(collection)?;

        self.commit(Operation::Delete {
            collection: collection.to_string(),
            filter,
        })
    }

    /// Find records matching `filter`
    pub fn find(&self, collection: &str, filter: &Filter) -> Vec<Record> {
        self.store.find(collection, filter)
    }

    /// Count records matching `filter`
    pub fn count(&self, collection: &str, filter: &Filter) -> usize {
        self.store.count(collection, filter)
    }

    /// All records of `collection` ordered by `key`
    pub fn sort(&self, collection: &str, key: &str) -> Vec<Record> {
        self.store.sort(collection, key)
    }

    /// Names of all collections
    pub fn list_collections(&self) -> Vec<String> {
        self.store.collection_names()
    }

    /// Snapshot the store, then truncate the WAL (compaction)
    ///
    /// Steps:
    /// 1. Acquire the WAL lock (blocks writers, not readers)
    /// 2. Save the snapshot (write-tmp, fsync, rename)
    /// 3. Truncate the WAL
    ///
    /// A snapshot failure is returned to the caller. A truncate failure is
    /// only logged: the snapshot stands, and the next compaction subsumes the
    /// longer log. Returns whether the WAL was truncated.
    pub fn save_snapshot(&self) -> Result<bool> {
        let mut wal = self.wal.lock();

        let bytes = self.snapshots.save(&self.store)?;
        tracing::info!(
            "snapshot saved to {} ({} bytes, {} records)",
            self.snapshots.path().display(),
            bytes,
            self.store.record_count()
        );

        match wal.truncate() {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::warn!(
                    "snapshot successful, but failed to truncate WAL {}: {}",
                    wal.path().display(),
                    e
                );
                Ok(false)
            }
        }
    }

    /// Close the database
    ///
    /// Syncs the WAL and releases its file handle.
    pub fn close(self) -> Result<()> {
        tracing::info!("closing database {}", self.config.log_path.display());
        self.wal.into_inner().close()
    }

    /// Log then apply one operation
    fn commit(&self, operation: Operation) -> Result<usize> {
        let mut wal = self.wal.lock();

        // The store is not touched unless the append succeeded
        wal.append(&operation)?;

        let affected = self.store.apply(operation);
        drop(wal);
        Ok(affected)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get what startup recovery found
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Get the underlying record store
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Current WAL length in bytes
    pub fn wal_len(&self) -> u64 {
        self.wal.lock().len()
    }
}
