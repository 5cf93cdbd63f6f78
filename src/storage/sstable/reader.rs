//! SSTable Reader
//!
//! Opens SSTable files and provides O(log n) key lookups via in-memory index.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{LedgerError, Result};

use super::iterator::SSTableIterator;
use super::{le_u32, le_u64, FOOTER_SIZE, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Reader for SSTable files with in-memory index for O(log n) lookups
pub struct SSTableReader {
    path: PathBuf,
    file: BufReader<File>,
    /// key → file offset of entry
    index: BTreeMap<Vec<u8>, u64>,
    entry_count: u64,
    /// Start of the index block (end of the data block)
    index_offset: u64,
    file_size: u64,
}

impl SSTableReader {
    /// Open an SSTable for reading
    ///
    /// Validates header and data-block CRC, then loads the index into memory.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(Self::corrupt(path, format!("file too small ({} bytes)", file_size)));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(Self::corrupt(path, format!("bad magic {:?}", &header[0..4])));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(Self::corrupt(path, format!("unsupported version {}", version)));
        }

        let entry_count = le_u64(&header, 6);

        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let index_offset = le_u64(&footer, 0);
        let data_crc = le_u32(&footer, 8);

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(Self::corrupt(path, format!("index offset {} out of range", index_offset)));
        }

        // Data block checksum
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut data = vec![0u8; (index_offset - HEADER_SIZE) as usize];
        file.read_exact(&mut data)?;
        if crc32fast::hash(&data) != data_crc {
            return Err(Self::corrupt(path, "data block CRC mismatch".to_string()));
        }

        // Index block: [key_len(4)][offset(8)][key] ...
        let mut index_data = vec![0u8; (file_size - FOOTER_SIZE - index_offset) as usize];
        file.read_exact(&mut index_data)?;

        let mut index = BTreeMap::new();
        let mut pos = 0;
        while pos < index_data.len() {
            if pos + 12 > index_data.len() {
                return Err(Self::corrupt(path, "truncated index entry".to_string()));
            }
            let key_len = le_u32(&index_data, pos) as usize;
            let offset = le_u64(&index_data, pos + 4);
            pos += 12;

            if pos + key_len > index_data.len() {
                return Err(Self::corrupt(path, "truncated index key".to_string()));
            }
            index.insert(index_data[pos..pos + key_len].to_vec(), offset);
            pos += key_len;
        }

        file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: BufReader::new(file),
            index,
            entry_count,
            index_offset,
            file_size,
        })
    }

    fn corrupt(path: &Path, reason: String) -> LedgerError {
        LedgerError::BackendIo(format!("SSTable {}: {}", path.display(), reason))
    }

    /// Get a value by key, O(log n) via the in-memory index
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found with value
    /// - `Ok(None)`: key found but is a tombstone (deleted)
    /// - `Err(NotFound)`: key not in this SSTable
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let offset = *self.index.get(key).ok_or(LedgerError::NotFound)?;

        self.file.seek(SeekFrom::Start(offset))?;
        let mut header = [0u8; 8];
        self.file.read_exact(&mut header)?;

        let key_len = le_u32(&header, 0) as i64;
        let val_len = le_u32(&header, 4);

        if val_len == TOMBSTONE_MARKER {
            return Ok(None);
        }

        self.file.seek(SeekFrom::Current(key_len))?;
        let mut value = vec![0u8; val_len as usize];
        self.file.read_exact(&mut value)?;

        Ok(Some(value))
    }

    /// Get entry count
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Size of the file on disk
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Path of the file on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the minimum key in this SSTable (for range filtering)
    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.keys().next().map(|k| k.as_slice())
    }

    /// Get the maximum key in this SSTable (for range filtering)
    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.keys().next_back().map(|k| k.as_slice())
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false only if the key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false,
        }
    }

    /// Create an iterator over all entries (tombstones included)
    pub fn iter(&mut self) -> Result<SSTableIterator<'_>> {
        SSTableIterator::new(&mut self.file, self.index_offset)
    }
}
