//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{LedgerError, Result};

use super::{WalEntry, HEADER_SIZE};

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,

    /// Byte offset of the next unread entry
    position: u64,

    /// File length when opened
    file_len: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            file_len,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at a clean end of file. A torn header or payload is
    /// reported as `WalCorruption`.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut header = [0u8; HEADER_SIZE];
        let read = read_full(&mut self.reader, &mut header)?;
        if read == 0 {
            return Ok(None);
        }
        if read < HEADER_SIZE {
            return Err(LedgerError::WalCorruption(format!(
                "partial header at offset {}",
                self.position
            )));
        }

        let (_, _, payload_len) = WalEntry::parse_header(&header)?;

        // Reject a length the file cannot hold before allocating for it
        let remaining = self.file_len.saturating_sub(self.position + HEADER_SIZE as u64);
        if payload_len as u64 > remaining {
            return Err(LedgerError::WalCorruption(format!(
                "entry at offset {} claims {} bytes, {} remain",
                self.position, payload_len, remaining
            )));
        }

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload_len);
        frame.extend_from_slice(&header);
        frame.resize(HEADER_SIZE + payload_len, 0);

        let read = read_full(&mut self.reader, &mut frame[HEADER_SIZE..])?;
        if read < payload_len {
            return Err(LedgerError::WalCorruption(format!(
                "partial entry at offset {}",
                self.position
            )));
        }

        let entry = WalEntry::deserialize(&frame)?;
        self.position += frame.len() as u64;
        Ok(Some(entry))
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Byte offset of the next unread entry
    pub fn position(&self) -> u64 {
        self.position
    }
}

/// Read until `buf` is full or EOF; returns the number of bytes read
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Iterator over WAL entries
///
/// Stops after the first error.
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
