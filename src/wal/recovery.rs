//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::{self, OpenOptions};
use std::path::Path;

use tracing::warn;

use crate::error::{LedgerError, Result};

use super::{WalEntry, HEADER_SIZE};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

/// Outcome of scanning a log image
struct Scan {
    entries: Vec<WalEntry>,
    result: RecoveryResult,
    /// Length of the valid prefix in bytes
    valid_len: u64,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at the first corrupted entry (counted, not returned)
    /// 3. Truncate the file to its valid prefix
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let bytes = fs::read(path)?;
        let scan = Self::scan(&bytes);

        if scan.result.was_truncated {
            warn!(
                path = %path.display(),
                valid_len = scan.valid_len,
                file_len = bytes.len(),
                corrupted = scan.result.entries_corrupted,
                "truncating torn WAL tail"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(scan.valid_len)?;
            file.sync_all()?;
        }

        Ok((scan.entries, scan.result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let bytes = fs::read(path)?;
        Ok(Self::scan(&bytes).result)
    }

    fn scan(bytes: &[u8]) -> Scan {
        let mut entries = Vec::new();
        let mut corrupted = 0u64;
        let mut last_lsn = 0u64;
        let mut pos = 0usize;
        let mut was_truncated = false;

        while pos < bytes.len() {
            let rest = &bytes[pos..];
            let payload_len = match WalEntry::parse_header(rest) {
                Ok((_, _, len)) => len,
                Err(_) => {
                    // Partial header
                    was_truncated = true;
                    break;
                }
            };

            let frame_len = HEADER_SIZE + payload_len;
            if rest.len() < frame_len {
                // Partial payload
                was_truncated = true;
                break;
            }

            match WalEntry::deserialize(&rest[..frame_len]) {
                Ok(entry) => {
                    last_lsn = entry.lsn;
                    entries.push(entry);
                    pos += frame_len;
                }
                Err(LedgerError::WalCorruption(_)) | Err(LedgerError::Serialization(_)) => {
                    corrupted += 1;
                    was_truncated = true;
                    break;
                }
                Err(_) => {
                    was_truncated = true;
                    break;
                }
            }
        }

        Scan {
            result: RecoveryResult {
                entries_recovered: entries.len() as u64,
                entries_corrupted: corrupted,
                last_lsn,
                was_truncated,
            },
            entries,
            valid_len: pos as u64,
        }
    }
}
