//! WAL Reader
//!
//! Splits a log file into records and decodes them in file order.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::Result;

use super::{Operation, RECORD_DELIMITER};

/// One record found while scanning the log
#[derive(Debug, Clone, PartialEq)]
pub enum WalRecord {
    /// A well-formed, delimited operation
    Entry { offset: u64, operation: Operation },

    /// A delimited record that failed to decode
    Corrupt { offset: u64, reason: String },

    /// Trailing bytes without a delimiter (crash mid-append)
    TornTail { offset: u64, len: u64 },
}

/// Reads entries from a WAL file
///
/// The whole file is read up front; iterating yields one `WalRecord` per
/// delimited line. Blank lines are skipped.
pub struct WalReader {
    data: Vec<u8>,
    position: usize,
}

impl WalReader {
    /// Open a WAL file for reading; a missing file reads as empty
    pub fn open(path: &Path) -> Result<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::from_bytes(data))
    }

    /// Read records from an in-memory log image
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    /// Read the next record from the WAL
    pub fn next_record(&mut self) -> Option<WalRecord> {
        loop {
            if self.position >= self.data.len() {
                return None;
            }

            let start = self.position;
            let remaining = &self.data[start..];

            let Some(end) = remaining.iter().position(|&b| b == RECORD_DELIMITER) else {
                self.position = self.data.len();
                return Some(WalRecord::TornTail {
                    offset: start as u64,
                    len: remaining.len() as u64,
                });
            };

            self.position = start + end + 1;
            let line = &remaining[..end];
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return Some(match Operation::decode(line) {
                Ok(operation) => WalRecord::Entry {
                    offset: start as u64,
                    operation,
                },
                Err(e) => WalRecord::Corrupt {
                    offset: start as u64,
                    reason: e.to_string(),
                },
            });
        }
    }

    /// Byte length of the log up to and including its last delimiter
    pub fn delimited_len(&self) -> u64 {
        self.data
            .iter()
            .rposition(|&b| b == RECORD_DELIMITER)
            .map(|i| i as u64 + 1)
            .unwrap_or(0)
    }

    /// Total bytes in the log image
    pub fn total_len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Decode every well-formed operation in `path`, skipping the rest
    pub fn read_operations(path: &Path) -> Result<Vec<Operation>> {
        Ok(Self::open(path)?
            .filter_map(|record| match record {
                WalRecord::Entry { operation, .. } => Some(operation),
                _ => None,
            })
            .collect())
    }
}

impl Iterator for WalReader {
    type Item = WalRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}
