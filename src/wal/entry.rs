//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their framing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Frame header size: LSN (8) + CRC (4) + Len (4) = 16 bytes
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },

    /// A write batch, replayed all-or-nothing
    Batch(Vec<Operation>),
}

impl Operation {
    /// Number of key-level mutations this operation carries
    pub fn mutation_count(&self) -> usize {
        match self {
            Operation::Put { .. } | Operation::Delete { .. } => 1,
            Operation::Batch(ops) => ops.iter().map(Operation::mutation_count).sum(),
        }
    }
}

impl WalEntry {
    /// Create a new entry stamped with the current wall-clock time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Encode the payload (timestamp + operation) with bincode
    fn encode_payload(&self) -> Result<Vec<u8>> {
        bincode::serialize(&(self.timestamp, &self.operation))
            .map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// CRC32 over the LSN and the encoded payload
    fn checksum(lsn: u64, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_le_bytes());
        hasher.update(payload);
        hasher.finalize()
    }

    /// Compute the CRC this entry is framed with
    pub fn compute_crc(&self) -> Result<u32> {
        let payload = self.encode_payload()?;
        Ok(Self::checksum(self.lsn, &payload))
    }

    /// Size of the framed entry in bytes
    pub fn serialized_size(&self) -> Result<usize> {
        let payload_len = bincode::serialized_size(&(self.timestamp, &self.operation))
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        Ok(HEADER_SIZE + payload_len as usize)
    }

    /// Frame the entry: [LSN (8)][CRC (4)][Len (4)][payload]
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = self.encode_payload()?;
        let payload_len = u32::try_from(payload.len()).map_err(|_| {
            LedgerError::WalWrite(format!("entry payload too large: {} bytes", payload.len()))
        })?;
        let crc = Self::checksum(self.lsn, &payload);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&self.lsn.to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&payload_len.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Parse a framed entry, validating length and CRC
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let (lsn, crc, payload_len) = Self::parse_header(bytes)?;

        let end = HEADER_SIZE + payload_len;
        if bytes.len() < end {
            return Err(LedgerError::WalCorruption(format!(
                "truncated entry: expected {} bytes, got {}",
                end,
                bytes.len()
            )));
        }

        let payload = &bytes[HEADER_SIZE..end];
        let actual = Self::checksum(lsn, payload);
        if actual != crc {
            return Err(LedgerError::WalCorruption(format!(
                "CRC mismatch at lsn {}: stored {:#010x}, computed {:#010x}",
                lsn, crc, actual
            )));
        }

        let (timestamp, operation): (u64, Operation) = bincode::deserialize(payload)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        Ok(Self {
            lsn,
            operation,
            timestamp,
        })
    }

    /// Read (lsn, crc, payload_len) from the first HEADER_SIZE bytes
    pub(crate) fn parse_header(bytes: &[u8]) -> Result<(u64, u32, usize)> {
        if bytes.len() < HEADER_SIZE {
            return Err(LedgerError::WalCorruption(format!(
                "header too small: {} bytes",
                bytes.len()
            )));
        }

        let mut lsn = [0u8; 8];
        lsn.copy_from_slice(&bytes[0..8]);
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&bytes[8..12]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[12..16]);

        Ok((
            u64::from_le_bytes(lsn),
            u32::from_le_bytes(crc),
            u32::from_le_bytes(len) as usize,
        ))
    }
}
