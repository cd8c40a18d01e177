//! Snapshot Manager
//!
//! Serializes the whole store into one file that becomes the new recovery
//! origin.
//!
//! ## Write protocol
//! 1. Serialize the store (read lock only)
//! 2. Write the payload to `<snapshot>.tmp`
//! 3. fsync the temp file
//! 4. Rename it over `<snapshot>` (atomic replace)
//! 5. fsync the parent directory (Unix)
//!
//! A crash before step 4 leaves the previous snapshot intact; a crash after
//! it leaves the new one. Readers never see a half-written snapshot.
//!
//! ## Compaction
//! `save` and `WalWriter::truncate` are two independent fallible steps, not
//! one transaction. If the process dies between them, or truncate fails,
//! recovery loads the new snapshot and replays the untruncated log on top of
//! it. Inserts carry fixed ids, so replayed inserts overwrite rather than
//! duplicate. Replayed updates and deletes run against the snapshot state,
//! not the state they were first applied to, and may match differently.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{DocStoreError, Result};
use crate::store::RecordStore;

/// Suffix appended to the snapshot path for the in-progress file
pub const TEMP_SUFFIX: &str = ".tmp";

/// Writes and reads the snapshot file
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    path: PathBuf,
}

impl SnapshotManager {
    /// Manage the snapshot at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Serialize `store` and commit it as the new recovery origin
    ///
    /// Returns the size of the snapshot in bytes.
    pub fn save(&self, store: &RecordStore) -> Result<u64> {
        let payload = store.serialize()?;
        self.write_atomic(&payload)?;
        tracing::debug!(
            "snapshot written to {} ({} bytes)",
            self.path.display(),
            payload.len()
        );
        Ok(payload.len() as u64)
    }

    /// Write `payload` to the temp path, then rename it into place
    pub fn write_atomic(&self, payload: &[u8]) -> Result<()> {
        let temp_path = self.temp_path();

        if let Some(parent) = self.parent_dir() {
            fs::create_dir_all(parent).map_err(|e| {
                snapshot_io(format!("failed to create directory {}", parent.display()), e)
            })?;
        }

        let result = write_synced(&temp_path, payload).and_then(|()| {
            fs::rename(&temp_path, &self.path).map_err(|e| {
                snapshot_io(
                    format!(
                        "failed to rename {} to {}",
                        temp_path.display(),
                        self.path.display()
                    ),
                    e,
                )
            })
        });

        if let Err(e) = result {
            // Best effort removal - we're already in an error path
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        self.sync_parent_dir()
    }

    /// Read the raw snapshot, or `None` if there is none
    pub fn load(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(snapshot_io(
                format!("failed to read {}", self.path.display()),
                e,
            )),
        }
    }

    /// Delete a temp file left behind by an interrupted save
    ///
    /// Returns whether one was found.
    pub fn remove_stale_temp(&self) -> Result<bool> {
        match fs::remove_file(self.temp_path()) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a snapshot file exists
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Get the snapshot path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path the payload is staged at: `<snapshot>.tmp`
    pub fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(TEMP_SUFFIX);
        PathBuf::from(name)
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    #[cfg(unix)]
    fn sync_parent_dir(&self) -> Result<()> {
        let dir = self.parent_dir().unwrap_or_else(|| Path::new("."));
        File::open(dir)
            .and_then(|d| d.sync_all())
            .map_err(|e| snapshot_io(format!("fsync directory failed: {}", dir.display()), e))
    }

    #[cfg(not(unix))]
    fn sync_parent_dir(&self) -> Result<()> {
        Ok(())
    }
}

fn write_synced(path: &Path, payload: &[u8]) -> Result<()> {
    let mut file = File::create(path)
        .map_err(|e| snapshot_io(format!("failed to create {}", path.display()), e))?;
    file.write_all(payload)
        .map_err(|e| snapshot_io(format!("failed to write {}", path.display()), e))?;
    file.sync_all()
        .map_err(|e| snapshot_io(format!("fsync failed for {}", path.display()), e))
}

fn snapshot_io(context: String, e: std::io::Error) -> DocStoreError {
    DocStoreError::Snapshot(format!("{}: {}", context, e))
}
