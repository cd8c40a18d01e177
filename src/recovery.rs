//! Recovery Coordinator
//!
//! Rebuilds the store on startup from the latest snapshot plus the WAL.
//!
//! ## Algorithm
//! 1. Load the snapshot. Absent → empty store. Corrupt → warn, empty store.
//! 2. Scan the WAL from the start and apply each record in file order.
//! 3. Skip delimited records that fail to decode (warn, keep scanning).
//! 4. Drop an undelimited tail silently and trim it from the file.
//!
//! Recovery never fails: the worst case is an empty store and a warning.
//! It runs before the `Database` handle exists, so no caller operation can
//! reach the store while it is in progress.

use std::fs::OpenOptions;

use crate::config::Config;
use crate::snapshot::SnapshotManager;
use crate::store::RecordStore;
use crate::wal::{WalReader, WalRecord};

/// What recovery found in the snapshot file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotStatus {
    /// No snapshot file; replay started from an empty store
    Absent,

    /// Snapshot loaded with this many records
    Loaded { records: usize },

    /// Snapshot unreadable; replay started from an empty store
    Corrupt { reason: String },
}

/// Result of a recovery operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// State of the recovery origin
    pub snapshot: SnapshotStatus,

    /// Number of WAL entries successfully replayed
    pub entries_recovered: u64,

    /// Number of corrupted WAL entries skipped
    pub entries_corrupted: u64,

    /// Whether an undelimited tail (partial write) was dropped
    pub was_truncated: bool,
}

impl RecoveryResult {
    /// True when nothing had to be skipped or discarded
    pub fn is_clean(&self) -> bool {
        !matches!(self.snapshot, SnapshotStatus::Corrupt { .. })
            && self.entries_corrupted == 0
            && !self.was_truncated
    }
}

/// Handles startup recovery
pub struct Recovery;

impl Recovery {
    /// Rebuild `store` from the snapshot and WAL named in `config`
    ///
    /// This will:
    /// 1. Remove a leftover `<snapshot>.tmp` from an interrupted save
    /// 2. Load the snapshot into `store`, if usable
    /// 3. Replay every decodable WAL entry
    /// 4. Trim a torn tail from the WAL file
    pub fn run(config: &Config, store: &RecordStore) -> RecoveryResult {
        let _span = tracing::info_span!("recovery", log = %config.log_path.display()).entered();

        let snapshots = SnapshotManager::new(&config.snapshot_path);
        match snapshots.remove_stale_temp() {
            Ok(true) => tracing::debug!("removed stale {}", snapshots.temp_path().display()),
            Ok(false) => {}
            Err(e) => tracing::warn!("could not remove stale snapshot temp file: {}", e),
        }

        let result = Self::restore(config, store, true);

        if result.is_clean() {
            tracing::info!(
                "recovered {} records ({} WAL entries replayed)",
                store.record_count(),
                result.entries_recovered
            );
        } else {
            tracing::warn!(
                "recovered {} records with losses: snapshot={:?}, {} WAL entries replayed, {} corrupted, torn tail dropped={}",
                store.record_count(),
                result.snapshot,
                result.entries_recovered,
                result.entries_corrupted,
                result.was_truncated
            );
        }
        result
    }

    /// Verify snapshot and WAL integrity without modifying anything
    ///
    /// Replays into a scratch store and reports what `run` would find.
    pub fn verify(config: &Config) -> RecoveryResult {
        Self::restore(config, &RecordStore::new(), false)
    }

    fn restore(config: &Config, store: &RecordStore, repair: bool) -> RecoveryResult {
        let snapshot = Self::load_snapshot(&SnapshotManager::new(&config.snapshot_path), store);

        let mut result = RecoveryResult {
            snapshot,
            entries_recovered: 0,
            entries_corrupted: 0,
            was_truncated: false,
        };

        let reader = match WalReader::open(&config.log_path) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::warn!(
                    "cannot read WAL {}: {}; continuing without replay",
                    config.log_path.display(),
                    e
                );
                return result;
            }
        };

        let delimited_len = reader.delimited_len();
        for record in reader {
            match record {
                WalRecord::Entry { operation, .. } => {
                    store.apply(operation);
                    result.entries_recovered += 1;
                }
                WalRecord::Corrupt { offset, reason } => {
                    tracing::warn!("skipping corrupt WAL record at offset {}: {}", offset, reason);
                    result.entries_corrupted += 1;
                }
                WalRecord::TornTail { offset, len } => {
                    tracing::debug!("dropping {} byte torn tail at offset {}", len, offset);
                    result.was_truncated = true;
                }
            }
        }

        if repair && result.was_truncated {
            Self::trim_torn_tail(config, delimited_len);
        }

        result
    }

    fn load_snapshot(snapshots: &SnapshotManager, store: &RecordStore) -> SnapshotStatus {
        let bytes = match snapshots.load() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return SnapshotStatus::Absent,
            Err(e) => {
                tracing::warn!("snapshot unreadable, starting from empty store: {}", e);
                return SnapshotStatus::Corrupt { reason: e.to_string() };
            }
        };

        match store.deserialize(&bytes) {
            Ok(records) => {
                tracing::debug!(
                    "loaded {} records from {}",
                    records,
                    snapshots.path().display()
                );
                SnapshotStatus::Loaded { records }
            }
            Err(e) => {
                tracing::warn!("snapshot corrupt, starting from empty store: {}", e);
                SnapshotStatus::Corrupt { reason: e.to_string() }
            }
        }
    }

    /// Cut the WAL back to its last delimiter so new appends start clean
    fn trim_torn_tail(config: &Config, delimited_len: u64) {
        let trimmed = OpenOptions::new()
            .write(true)
            .open(&config.log_path)
            .and_then(|file| {
                file.set_len(delimited_len)?;
                file.sync_all()
            });

        if let Err(e) = trimmed {
            tracing::warn!(
                "could not trim torn tail from {}: {}",
                config.log_path.display(),
                e
            );
        }
    }
}
