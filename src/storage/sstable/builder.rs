//! SSTable Builder
//!
//! Writes sorted key-value entries to a new SSTable file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{LedgerError, Result};

use super::{SSTable, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Builder for creating new SSTables from sorted entries
///
/// Keys must be added in strictly increasing order; anything else is rejected
/// so a reader's binary-searchable index stays correct.
pub struct SSTableBuilder {
    path: PathBuf,
    writer: BufWriter<File>,
    entry_count: u64,
    /// Offset the next entry will be written at
    offset: u64,
    /// key → file offset of entry
    index: Vec<(Vec<u8>, u64)>,
    /// CRC over the data block
    crc: crc32fast::Hasher,
}

impl SSTableBuilder {
    /// Create a new SSTable builder
    ///
    /// The header is written immediately with a zero entry count that
    /// `finish()` patches.
    pub fn new(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            entry_count: 0,
            offset: HEADER_SIZE,
            index: Vec::new(),
            crc: crc32fast::Hasher::new(),
        })
    }

    /// Add a key-value pair
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if value.len() >= TOMBSTONE_MARKER as usize {
            return Err(LedgerError::ValueTooLarge {
                size: value.len(),
                limit: TOMBSTONE_MARKER as usize - 1,
            });
        }
        self.append(key, Some(value))
    }

    /// Add a tombstone
    pub fn add_tombstone(&mut self, key: &[u8]) -> Result<()> {
        self.append(key, None)
    }

    fn append(&mut self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        if let Some((last, _)) = self.index.last() {
            if key <= last.as_slice() {
                return Err(LedgerError::BackendIo(format!(
                    "SSTable keys out of order: {:?} after {:?}",
                    key, last
                )));
            }
        }
        let key_len = u32::try_from(key.len())
            .map_err(|_| LedgerError::BackendIo(format!("key too long: {} bytes", key.len())))?;
        let val_len = value.map_or(TOMBSTONE_MARKER, |v| v.len() as u32);

        let mut frame = Vec::with_capacity(8 + key.len() + value.map_or(0, <[u8]>::len));
        frame.extend_from_slice(&key_len.to_le_bytes());
        frame.extend_from_slice(&val_len.to_le_bytes());
        frame.extend_from_slice(key);
        if let Some(v) = value {
            frame.extend_from_slice(v);
        }

        self.writer.write_all(&frame)?;
        self.crc.update(&frame);
        self.index.push((key.to_vec(), self.offset));

        self.offset += frame.len() as u64;
        self.entry_count += 1;
        Ok(())
    }

    /// Finish building: write index block, footer, and return metadata
    pub fn finish(mut self) -> Result<SSTable> {
        let index_offset = self.offset;

        for (key, offset) in &self.index {
            self.writer.write_all(&(key.len() as u32).to_le_bytes())?;
            self.writer.write_all(&offset.to_le_bytes())?;
            self.writer.write_all(key)?;
        }

        let data_crc = self.crc.finalize();
        self.writer.write_all(&index_offset.to_le_bytes())?;
        self.writer.write_all(&data_crc.to_le_bytes())?;
        self.writer.write_all(&[0u8; 4])?;
        self.writer.flush()?;

        let mut file = self
            .writer
            .into_inner()
            .map_err(|e| LedgerError::BackendIo(format!("failed to flush SSTable: {}", e)))?;

        // Patch entry count after magic + version
        file.seek(SeekFrom::Start(6))?;
        file.write_all(&self.entry_count.to_le_bytes())?;
        file.sync_all()?;

        let file_size = file.metadata()?.len();
        let min_key = self.index.first().map(|(k, _)| k.clone()).unwrap_or_default();
        let max_key = self.index.last().map(|(k, _)| k.clone()).unwrap_or_default();

        Ok(SSTable {
            path: self.path,
            entry_count: self.entry_count,
            min_key,
            max_key,
            file_size,
        })
    }
}
