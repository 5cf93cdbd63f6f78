//! SSTable Tests
//!
//! Tests verify:
//! - Builder output and metadata (counts, key range, size)
//! - Point lookups, including tombstones and absent keys
//! - Ordered iteration
//! - Rejection of unordered keys and damaged files

use std::fs;
use std::path::PathBuf;

use ledgerkv::storage::{SSTable, SSTableBuilder, SSTableReader};
use ledgerkv::LedgerError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_path() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.sst");
    (temp_dir, path)
}

/// Build an SSTable; `None` values become tombstones
fn build(path: &PathBuf, entries: &[(&[u8], Option<&[u8]>)]) -> SSTable {
    let mut builder = SSTableBuilder::new(path).unwrap();
    for (key, value) in entries {
        match value {
            Some(v) => builder.add(key, v).unwrap(),
            None => builder.add_tombstone(key).unwrap(),
        }
    }
    builder.finish().unwrap()
}

// =============================================================================
// Builder Tests
// =============================================================================

#[test]
fn test_builder_metadata() {
    let (_temp, path) = setup_temp_path();

    let sst = build(
        &path,
        &[(b"apple", Some(b"1")), (b"banana", None), (b"cherry", Some(b"3"))],
    );

    assert_eq!(sst.entry_count(), 3);
    assert_eq!(sst.min_key, b"apple");
    assert_eq!(sst.max_key, b"cherry");
    assert_eq!(sst.file_size, fs::metadata(&path).unwrap().len());
    assert_eq!(sst.path, path);
}

#[test]
fn test_builder_empty_sstable() {
    let (_temp, path) = setup_temp_path();

    let sst = build(&path, &[]);

    assert_eq!(sst.entry_count(), 0);
    assert!(!sst.might_contain(b""));

    let reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.entry_count(), 0);
    assert_eq!(reader.min_key(), None);
}

#[test]
fn test_builder_rejects_unordered_keys() {
    let (_temp, path) = setup_temp_path();
    let mut builder = SSTableBuilder::new(&path).unwrap();
    builder.add(b"b", b"2").unwrap();

    assert!(matches!(builder.add(b"a", b"1"), Err(LedgerError::BackendIo(_))));
    assert!(matches!(builder.add_tombstone(b"b"), Err(LedgerError::BackendIo(_))));
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_reader_point_lookups() {
    let (_temp, path) = setup_temp_path();
    build(
        &path,
        &[(b"a", Some(b"alpha")), (b"b", None), (b"c", Some(b""))],
    );

    let mut reader = SSTableReader::open(&path).unwrap();

    assert_eq!(reader.get(b"a").unwrap(), Some(b"alpha".to_vec()));
    assert_eq!(reader.get(b"b").unwrap(), None);
    assert_eq!(reader.get(b"c").unwrap(), Some(Vec::new()));
    assert!(matches!(reader.get(b"zzz"), Err(LedgerError::NotFound)));
}

#[test]
fn test_reader_random_access_order() {
    let (_temp, path) = setup_temp_path();
    let keys: Vec<String> = (0..50).map(|i| format!("key{:03}", i)).collect();
    {
        let mut builder = SSTableBuilder::new(&path).unwrap();
        for key in &keys {
            builder.add(key.as_bytes(), key.to_uppercase().as_bytes()).unwrap();
        }
        builder.finish().unwrap();
    }

    let mut reader = SSTableReader::open(&path).unwrap();
    for i in [49, 0, 25, 7, 48, 1] {
        let value = reader.get(keys[i].as_bytes()).unwrap().unwrap();
        assert_eq!(value, keys[i].to_uppercase().into_bytes());
    }
}

#[test]
fn test_might_contain_range() {
    let (_temp, path) = setup_temp_path();
    build(&path, &[(b"d", Some(b"1")), (b"m", Some(b"2"))]);

    let reader = SSTableReader::open(&path).unwrap();

    assert!(reader.might_contain(b"d"));
    assert!(reader.might_contain(b"f"));
    assert!(reader.might_contain(b"m"));
    assert!(!reader.might_contain(b"a"));
    assert!(!reader.might_contain(b"z"));
}

// =============================================================================
// Iterator Tests
// =============================================================================

#[test]
fn test_iterator_yields_sorted_entries_with_tombstones() {
    let (_temp, path) = setup_temp_path();
    build(
        &path,
        &[(b"a", Some(b"1")), (b"b", None), (b"c", Some(b"3"))],
    );

    let mut reader = SSTableReader::open(&path).unwrap();
    let entries: Vec<_> = reader.iter().unwrap().map(|e| e.unwrap()).collect();

    assert_eq!(
        entries,
        vec![
            (b"a".to_vec(), Some(b"1".to_vec())),
            (b"b".to_vec(), None),
            (b"c".to_vec(), Some(b"3".to_vec())),
        ]
    );
}

#[test]
fn test_iterator_then_get() {
    let (_temp, path) = setup_temp_path();
    build(&path, &[(b"a", Some(b"1")), (b"b", Some(b"2"))]);

    let mut reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.iter().unwrap().count(), 2);

    // Lookups seek on their own
    assert_eq!(reader.get(b"a").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn test_large_values() {
    let (_temp, path) = setup_temp_path();
    let big = vec![0x5Au8; 512 * 1024];
    build(&path, &[(b"big", Some(&big)), (b"small", Some(b"s"))]);

    let mut reader = SSTableReader::open(&path).unwrap();

    assert_eq!(reader.get(b"big").unwrap(), Some(big));
}

// =============================================================================
// Damaged File Tests
// =============================================================================

#[test]
fn test_open_nonexistent_file() {
    let (_temp, path) = setup_temp_path();

    assert!(matches!(SSTableReader::open(&path), Err(LedgerError::Io(_))));
}

#[test]
fn test_open_invalid_magic() {
    let (_temp, path) = setup_temp_path();
    build(&path, &[(b"a", Some(b"1"))]);
    let mut bytes = fs::read(&path).unwrap();
    bytes[0..4].copy_from_slice(b"NOPE");
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(SSTableReader::open(&path), Err(LedgerError::BackendIo(_))));
}

#[test]
fn test_open_detects_flipped_data_byte() {
    let (_temp, path) = setup_temp_path();
    build(&path, &[(b"key", Some(b"value"))]);
    let mut bytes = fs::read(&path).unwrap();
    // First byte of the value inside the data block
    bytes[14 + 8 + 3] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(SSTableReader::open(&path), Err(LedgerError::BackendIo(_))));
}

#[test]
fn test_open_too_small() {
    let (_temp, path) = setup_temp_path();
    fs::write(&path, b"LKVS").unwrap();

    assert!(matches!(SSTableReader::open(&path), Err(LedgerError::BackendIo(_))));
}
