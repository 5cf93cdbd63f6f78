//! Tests for WAL Reader
//!
//! These tests verify:
//! - Sequential reads and the iterator adapter
//! - Torn headers and payloads at the tail
//! - Position tracking

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use ledgerkv::wal::{Operation, WalEntry, WalReader};
use ledgerkv::LedgerError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("wal.log");
    (temp_dir, wal_path)
}

fn entry(lsn: u64) -> WalEntry {
    WalEntry::new(
        lsn,
        Operation::Put {
            key: format!("k{}", lsn).into_bytes(),
            value: format!("v{}", lsn).into_bytes(),
        },
    )
}

fn write_entries(path: &Path, entries: &[WalEntry]) -> Vec<usize> {
    let mut file = File::create(path).unwrap();
    let mut sizes = Vec::new();
    for e in entries {
        let bytes = e.serialize().unwrap();
        sizes.push(bytes.len());
        file.write_all(&bytes).unwrap();
    }
    file.sync_all().unwrap();
    sizes
}

fn append_raw(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

// =============================================================================
// Basic Reading Tests
// =============================================================================

#[test]
fn test_read_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();

    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_read_entries_in_order() {
    let (_temp, wal_path) = setup_temp_wal();
    let written = vec![entry(1), entry(2), entry(3)];
    write_entries(&wal_path, &written);

    let mut reader = WalReader::open(&wal_path).unwrap();
    for expected in &written {
        assert_eq!(&reader.next_entry().unwrap().unwrap(), expected);
    }
    assert!(reader.next_entry().unwrap().is_none());
}

#[test]
fn test_position_advances_by_frame_size() {
    let (_temp, wal_path) = setup_temp_wal();
    let sizes = write_entries(&wal_path, &[entry(1), entry(2)]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    reader.next_entry().unwrap();
    assert_eq!(reader.position(), sizes[0] as u64);

    reader.next_entry().unwrap();
    assert_eq!(reader.position(), (sizes[0] + sizes[1]) as u64);
}

#[test]
fn test_open_missing_file() {
    let (_temp, wal_path) = setup_temp_wal();

    assert!(matches!(WalReader::open(&wal_path), Err(LedgerError::Io(_))));
}

// =============================================================================
// Iterator Tests
// =============================================================================

#[test]
fn test_iterator_yields_all_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries(&wal_path, &[entry(1), entry(2), entry(3), entry(4)]);

    let lsns: Vec<u64> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap().lsn)
        .collect();

    assert_eq!(lsns, vec![1, 2, 3, 4]);
}

#[test]
fn test_iterator_stops_after_first_error() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries(&wal_path, &[entry(1)]);
    append_raw(&wal_path, &[0u8; 5]);

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}

// =============================================================================
// Partial Write Tests
// =============================================================================

#[test]
fn test_partial_header() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries(&wal_path, &[entry(1)]);
    append_raw(&wal_path, &[1, 2, 3, 4, 5, 6, 7]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());

    let result = reader.next_entry();
    assert!(matches!(result, Err(LedgerError::WalCorruption(_))));
}

#[test]
fn test_partial_payload() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries(&wal_path, &[entry(1)]);
    let torn = entry(2).serialize().unwrap();
    append_raw(&wal_path, &torn[..torn.len() - 3]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());

    let result = reader.next_entry();
    assert!(matches!(result, Err(LedgerError::WalCorruption(_))));
}

#[test]
fn test_corrupt_length_beyond_file_end() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries(&wal_path, &[entry(1)]);
    let mut header = vec![0u8; 12];
    header.extend_from_slice(&u32::MAX.to_le_bytes());
    append_raw(&wal_path, &header);
    append_raw(&wal_path, b"short");

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());

    match reader.next_entry() {
        Err(LedgerError::WalCorruption(msg)) => assert!(msg.contains("5 remain"), "{}", msg),
        other => panic!("expected WalCorruption, got {:?}", other),
    }
}

#[test]
fn test_large_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let big = WalEntry::new(
        1,
        Operation::Put {
            key: b"big".to_vec(),
            value: vec![7u8; 256 * 1024],
        },
    );
    write_entries(&wal_path, std::slice::from_ref(&big));

    let read = WalReader::open(&wal_path).unwrap().next_entry().unwrap();

    assert_eq!(read, Some(big));
}
