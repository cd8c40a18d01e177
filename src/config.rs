//! Configuration for DocStore
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

use crate::error::{DocStoreError, Result};

/// Extension given to the snapshot file derived from the log path
pub const SNAPSHOT_EXTENSION: &str = "snap";

/// Default log file used when no path is given
pub const DEFAULT_LOG_PATH: &str = "data.mem";

/// Main configuration for a DocStore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Write-ahead log file (newline-delimited JSON operations)
    pub log_path: PathBuf,

    /// Snapshot file; the recovery origin for WAL replay.
    /// Defaults to `log_path` with its extension replaced by `snap`.
    pub snapshot_path: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries.
    ///
    /// Acknowledged entries sit in the OS page cache until the sync, so an OS
    /// crash (not a process crash) can lose up to `count - 1` of them.
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self::for_log(DEFAULT_LOG_PATH)
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Default config for the given log file, with the derived snapshot path
    pub fn for_log(log_path: impl Into<PathBuf>) -> Self {
        let log_path = log_path.into();
        Self {
            snapshot_path: snapshot_path_for(&log_path),
            log_path,
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
        }
    }

    /// Reject configurations that cannot be opened
    pub fn validate(&self) -> Result<()> {
        if self.log_path.as_os_str().is_empty() {
            return Err(DocStoreError::Config("log path is empty".to_string()));
        }
        if self.log_path == self.snapshot_path {
            return Err(DocStoreError::Config(format!(
                "log and snapshot share the same path: {}",
                self.log_path.display()
            )));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(DocStoreError::Config(
                "EveryNEntries sync count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Derive the companion snapshot path: `data.mem` → `data.snap`
pub fn snapshot_path_for(log_path: &Path) -> PathBuf {
    log_path.with_extension(SNAPSHOT_EXTENSION)
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    log_path: Option<PathBuf>,
    snapshot_path: Option<PathBuf>,
    wal_sync_strategy: Option<WalSyncStrategy>,
}

impl ConfigBuilder {
    /// Set the WAL file path
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Override the derived snapshot path
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.wal_sync_strategy = Some(strategy);
        self
    }

    pub fn build(self) -> Config {
        let mut config = Config::for_log(
            self.log_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
        );
        if let Some(path) = self.snapshot_path {
            config.snapshot_path = path;
        }
        if let Some(strategy) = self.wal_sync_strategy {
            config.wal_sync_strategy = strategy;
        }
        config
    }
}
