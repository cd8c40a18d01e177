//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{DocStoreError, Result};

use super::{Operation, RECORD_DELIMITER};

/// Writes entries to the WAL file
///
/// Single writer: callers serialize access (the engine keeps it behind a
/// mutex). The file is opened in append mode, so every write lands at the
/// end regardless of the cursor.
pub struct WalWriter {
    /// Path of the log file
    path: PathBuf,

    /// Append-mode file handle
    file: File,

    /// When to fsync
    sync_strategy: WalSyncStrategy,

    /// Length of the log as far as complete records go
    len: u64,

    /// Entries appended through this writer
    entries_written: u64,

    /// Entries written since the last fsync
    uncommitted: usize,

    /// A failed append left bytes past `len` that could not be cut off
    dirty: bool,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// If the file ends in an undelimited record (a torn write that recovery
    /// could not trim), a delimiter is appended so the next entry starts on
    /// a record boundary.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut len = file.metadata()?.len();
        if len > 0 && !ends_with_delimiter(&mut file, len)? {
            tracing::warn!(
                "WAL {} ends with an undelimited record; sealing it",
                path.display()
            );
            file.write_all(&[RECORD_DELIMITER])?;
            file.sync_data()?;
            len += 1;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            sync_strategy,
            len,
            entries_written: 0,
            uncommitted: 0,
            dirty: false,
        })
    }

    /// Append an operation to the WAL
    ///
    /// Returns the byte offset the record starts at. With
    /// `WalSyncStrategy::EveryWrite` the record is fsynced before this
    /// returns. On failure the file is cut back to its previous length so no
    /// partial record is left behind. If that cut fails, it is retried
    /// before the next append, and appends are refused until it succeeds.
    pub fn append(&mut self, operation: &Operation) -> Result<u64> {
        self.clear_dirty_tail()?;
        let bytes = operation.encode()?;
        let offset = self.len;

        if let Err(e) = self.file.write_all(&bytes) {
            self.rollback();
            return Err(DocStoreError::WalWrite(format!(
                "failed to append {} at offset {}: {}",
                operation.kind(),
                offset,
                e
            )));
        }
        self.uncommitted += 1;

        if self.should_sync() {
            if let Err(e) = self.file.sync_data() {
                self.uncommitted -= 1;
                self.rollback();
                return Err(DocStoreError::WalWrite(format!(
                    "fsync failed after {} at offset {}: {}",
                    operation.kind(),
                    offset,
                    e
                )));
            }
            self.uncommitted = 0;
        }

        self.len += bytes.len() as u64;
        self.entries_written += 1;

        tracing::trace!(
            "WAL append {} on '{}' at offset {}",
            operation.kind(),
            operation.collection(),
            offset
        );
        Ok(offset)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Empty the log
    ///
    /// Only safe once a snapshot covering every prior entry is durable.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.len = 0;
        self.uncommitted = 0;
        self.dirty = false;
        Ok(())
    }

    /// Sync and release the file handle
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }

    /// Get the log file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current length of the log in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Check if the log holds no records
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries appended since this writer was opened
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Entries written but not yet fsynced
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    fn should_sync(&self) -> bool {
        match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.uncommitted >= count,
        }
    }

    /// Cut the file back to the last complete record
    fn rollback(&mut self) {
        if let Err(e) = self.file.set_len(self.len) {
            self.dirty = true;
            tracing::error!(
                "failed to roll back partial WAL write in {}: {}",
                self.path.display(),
                e
            );
        }
    }

    /// Retry a failed rollback; nothing is appended behind leftover bytes
    fn clear_dirty_tail(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        self.file
            .set_len(self.len)
            .and_then(|()| self.file.sync_all())
            .map_err(|e| {
                DocStoreError::WalWrite(format!(
                    "WAL {} has an unremoved partial record at offset {}: {}",
                    self.path.display(),
                    self.len,
                    e
                ))
            })?;

        self.dirty = false;
        tracing::info!("removed partial WAL record from {}", self.path.display());
        Ok(())
    }
}

fn ends_with_delimiter(file: &mut File, len: u64) -> Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == RECORD_DELIMITER)
}
