//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Recovery from clean and empty logs
//! - Torn tails are truncated away
//! - CRC failures stop recovery and are counted
//! - Verify mode leaves the file untouched

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use ledgerkv::config::WalSyncStrategy;
use ledgerkv::wal::{Operation, WalEntry, WalRecovery, WalWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("wal.log");
    (temp_dir, wal_path)
}

/// Write a well-formed log through the writer
fn write_entries_via_writer(path: &Path, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer
            .append(Operation::Put {
                key: format!("key{}", i).into_bytes(),
                value: format!("value{}", i).into_bytes(),
            })
            .unwrap();
    }
}

/// Serialized frames, for crafting damage by hand
fn frames(count: u64) -> Vec<Vec<u8>> {
    (1..=count)
        .map(|lsn| {
            WalEntry::new(lsn, Operation::Delete { key: format!("k{}", lsn).into_bytes() })
                .serialize()
                .unwrap()
        })
        .collect()
}

fn write_raw(path: &Path, bytes: &[u8]) {
    let mut file = File::create(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Clean Log Tests
// =============================================================================

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.last_lsn, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_clean_log() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 5);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 5);
    assert_eq!(result.entries_recovered, 5);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 5);
    assert!(!result.was_truncated);
    assert_eq!(
        entries[2].operation,
        Operation::Put {
            key: b"key2".to_vec(),
            value: b"value2".to_vec(),
        }
    );
}

// =============================================================================
// Torn Tail Tests
// =============================================================================

#[test]
fn test_partial_header_is_truncated() {
    let (_temp, wal_path) = setup_temp_wal();
    let frames = frames(2);
    let mut bytes = frames.concat();
    let valid_len = bytes.len() as u64;
    bytes.extend_from_slice(&[0xAA; 9]);
    write_raw(&wal_path, &bytes);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(result.entries_corrupted, 0);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), valid_len);
}

#[test]
fn test_partial_payload_is_truncated() {
    let (_temp, wal_path) = setup_temp_wal();
    let frames = frames(3);
    let mut bytes = frames[..2].concat();
    let valid_len = bytes.len() as u64;
    bytes.extend_from_slice(&frames[2][..frames[2].len() - 1]);
    write_raw(&wal_path, &bytes);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(result.last_lsn, 2);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), valid_len);
}

#[test]
fn test_writer_appends_cleanly_after_recovery() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    OpenOptions::new()
        .append(true)
        .open(&wal_path)
        .unwrap()
        .write_all(&[1, 2, 3])
        .unwrap();

    WalRecovery::recover(&wal_path).unwrap();
    write_entries_via_writer(&wal_path, 1);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(result.last_lsn, 3);
    assert!(!result.was_truncated);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_corrupted_entry_stops_recovery() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut frames = frames(4);
    let last = frames[2].len() - 1;
    frames[2][last] ^= 0xFF;
    write_raw(&wal_path, &frames.concat());

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 2);
    assert!(result.was_truncated);
}

#[test]
fn test_corruption_at_first_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut frames = frames(2);
    frames[0][HEADER_OFFSET_CRC] ^= 0xFF;
    write_raw(&wal_path, &frames.concat());

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
}

const HEADER_OFFSET_CRC: usize = 8;

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut bytes = frames(2).concat();
    bytes.extend_from_slice(&[0u8; 4]);
    write_raw(&wal_path, &bytes);

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 2);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), bytes.len() as u64);
}

#[test]
fn test_recover_and_verify_agree() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut frames = frames(5);
    frames[3][20] ^= 0x10;
    write_raw(&wal_path, &frames.concat());

    let verified = WalRecovery::verify(&wal_path).unwrap();
    let (_, recovered) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(verified, recovered);
}
