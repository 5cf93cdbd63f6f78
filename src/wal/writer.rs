//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{LedgerError, Result};

use super::{Operation, WalEntry, WalRecovery};

/// Writes entries to the WAL file
pub struct WalWriter {
    /// Path of the log file
    path: PathBuf,

    /// Buffered append handle
    file: BufWriter<File>,

    /// LSN handed to the next appended entry
    current_lsn: u64,

    /// When to fsync
    sync_strategy: WalSyncStrategy,

    /// Entries written since the last sync
    uncommitted: usize,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// An existing log is appended to; LSNs continue after its last valid entry.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let next_lsn = if path.exists() {
            WalRecovery::verify(path)?.last_lsn + 1
        } else {
            1
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: BufWriter::new(file),
            current_lsn: next_lsn,
            sync_strategy,
            uncommitted: 0,
        })
    }

    /// Append an operation, returning the LSN it was logged under
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let lsn = self.current_lsn;
        let bytes = WalEntry::new(lsn, operation).serialize()?;

        self.file
            .write_all(&bytes)
            .map_err(|e| LedgerError::WalWrite(format!("append at lsn {}: {}", lsn, e)))?;

        self.current_lsn += 1;
        self.uncommitted += 1;

        match self.sync_strategy {
            WalSyncStrategy::EveryWrite => self.sync()?,
            WalSyncStrategy::EveryNEntries { count } => {
                if self.uncommitted >= count {
                    self.sync()?;
                }
            }
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.get_ref().sync_data()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Discard every entry (called once they are durable elsewhere)
    pub fn truncate(&mut self) -> Result<()> {
        self.file.flush()?;
        let file = self.file.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.sync_all()?;

        self.current_lsn = 1;
        self.uncommitted = 0;
        Ok(())
    }

    /// Get the LSN the next entry will receive
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    /// Entries appended but not yet synced
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
