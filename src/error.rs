//! Error types for DocStore
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using DocStoreError
pub type Result<T> = std::result::Result<T, DocStoreError>;

/// Unified error type for DocStore operations
#[derive(Debug, Error)]
pub enum DocStoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error: {0}")]
    Parse(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DocStoreError {
    /// Whether the error was caused by the caller rather than the storage layer
    pub fn is_caller_error(&self) -> bool {
        matches!(self, DocStoreError::InvalidInput(_) | DocStoreError::Parse(_))
    }
}
