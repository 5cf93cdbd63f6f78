//! Cursor Tests
//!
//! Tests verify, against both backends:
//! - Ordered iteration (backward is the exact reverse of forward)
//! - Seek semantics
//! - Backend-specific operations and their errors
//! - Close idempotence and use after close

use ledgerkv::{BackendKind, Config, Cursor, LedgerError, StorageFacade};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const BACKENDS: [BackendKind; 2] = [BackendKind::Embedded, BackendKind::Versioned];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn open_facade(backend: BackendKind) -> (TempDir, StorageFacade) {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .backend(backend)
        .build();
    let facade = StorageFacade::open(config).unwrap();
    (temp_dir, facade)
}

/// Facade whose default partition holds `keys` (value = key uppercased)
fn facade_with(backend: BackendKind, keys: &[&str]) -> (TempDir, StorageFacade) {
    let (temp, facade) = open_facade(backend);
    let default = facade.default_partition();
    for key in keys {
        facade
            .put(default, key.as_bytes(), key.to_uppercase().as_bytes())
            .unwrap();
    }
    (temp, facade)
}

fn current_key(cursor: &Cursor) -> Vec<u8> {
    cursor.key().unwrap().unwrap().to_vec()
}

fn collect_forward(cursor: &mut Cursor) -> Vec<Vec<u8>> {
    let mut keys = Vec::new();
    cursor.seek_to_first().unwrap();
    while cursor.valid() {
        keys.push(current_key(cursor));
        cursor.next().unwrap();
    }
    keys
}

fn collect_backward(cursor: &mut Cursor) -> Vec<Vec<u8>> {
    let mut keys = Vec::new();
    cursor.seek_to_last().unwrap();
    while cursor.valid() {
        keys.push(current_key(cursor));
        cursor.prev().unwrap();
    }
    keys
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_forward_iteration_is_sorted() {
    for backend in BACKENDS {
        let (_temp, facade) = facade_with(backend, &["delta", "alpha", "charlie", "bravo"]);
        let mut cursor = facade.new_cursor(facade.default_partition()).unwrap();

        let keys = collect_forward(&mut cursor);

        assert_eq!(
            keys,
            vec![
                b"alpha".to_vec(),
                b"bravo".to_vec(),
                b"charlie".to_vec(),
                b"delta".to_vec()
            ],
            "backend {}",
            backend
        );
        cursor.close().unwrap();
    }
}

#[test]
fn test_backward_is_reverse_of_forward() {
    for backend in BACKENDS {
        let keys: Vec<String> = (0..30).map(|i| format!("k{:02}", (i * 7) % 30)).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let (_temp, facade) = facade_with(backend, &key_refs);
        let mut cursor = facade.new_cursor(facade.default_partition()).unwrap();

        let forward = collect_forward(&mut cursor);
        let mut backward = collect_backward(&mut cursor);
        backward.reverse();

        assert_eq!(forward.len(), 30);
        assert_eq!(forward, backward, "backend {}", backend);
    }
}

#[test]
fn test_values_follow_keys() {
    for backend in BACKENDS {
        let (_temp, facade) = facade_with(backend, &["a", "b"]);
        let mut cursor = facade.new_cursor(facade.default_partition()).unwrap();

        cursor.seek_to_first().unwrap();
        assert_eq!(cursor.value().unwrap().unwrap(), b"A");
        cursor.next().unwrap();
        assert_eq!(cursor.value().unwrap().unwrap(), b"B");
        cursor.next().unwrap();
        assert!(!cursor.valid());
        assert!(cursor.key().unwrap().is_none());
        assert!(cursor.value().unwrap().is_none());
    }
}

#[test]
fn test_empty_partition_is_never_valid() {
    for backend in BACKENDS {
        let (_temp, facade) = open_facade(backend);
        let mut cursor = facade.new_cursor(facade.default_partition()).unwrap();

        assert!(!cursor.valid());
        cursor.seek_to_first().unwrap();
        assert!(!cursor.valid());
        cursor.seek_to_last().unwrap();
        assert!(!cursor.valid());
        cursor.seek(b"anything").unwrap();
        assert!(!cursor.valid());
    }
}

#[test]
fn test_cursor_reads_a_point_in_time_view() {
    for backend in BACKENDS {
        let (_temp, facade) = facade_with(backend, &["a", "c"]);
        let default = facade.default_partition();
        let mut cursor = facade.new_cursor(default).unwrap();

        facade.put(default, b"b", b"late").unwrap();
        facade.delete(default, b"c").unwrap();

        assert_eq!(
            collect_forward(&mut cursor),
            vec![b"a".to_vec(), b"c".to_vec()],
            "backend {}",
            backend
        );
    }
}

// =============================================================================
// Seek Tests
// =============================================================================

#[test]
fn test_seek_lands_on_first_key_not_less_than_target() {
    for backend in BACKENDS {
        let (_temp, facade) = facade_with(backend, &["b", "d", "f"]);
        let mut cursor = facade.new_cursor(facade.default_partition()).unwrap();

        cursor.seek(b"d").unwrap();
        assert_eq!(current_key(&cursor), b"d");

        cursor.seek(b"c").unwrap();
        assert_eq!(current_key(&cursor), b"d");

        cursor.seek(b"").unwrap();
        assert_eq!(current_key(&cursor), b"b");

        cursor.seek(b"g").unwrap();
        assert!(!cursor.valid(), "backend {}", backend);
    }
}

#[test]
fn test_step_on_invalid_cursor_fails() {
    for backend in BACKENDS {
        let (_temp, facade) = facade_with(backend, &["a"]);
        let mut cursor = facade.new_cursor(facade.default_partition()).unwrap();

        assert!(cursor.next().is_err(), "backend {}", backend);
        assert!(cursor.prev().is_err(), "backend {}", backend);
    }
}

// =============================================================================
// Backend-Specific Operation Tests
// =============================================================================

#[test]
fn test_valid_for_prefix_embedded() {
    let (_temp, facade) = facade_with(BackendKind::Embedded, &["tx:1", "tx:2", "ub:1"]);
    let mut cursor = facade.new_cursor(facade.default_partition()).unwrap();

    cursor.seek(b"tx:").unwrap();
    let mut matched = 0;
    while cursor.valid_for_prefix(b"tx:").unwrap() {
        matched += 1;
        cursor.next().unwrap();
    }

    assert_eq!(matched, 2);
    assert!(cursor.valid());
}

#[test]
fn test_valid_for_prefix_versioned_is_invalid_operation() {
    let (_temp, facade) = facade_with(BackendKind::Versioned, &["tx:1"]);
    let mut cursor = facade.new_cursor(facade.default_partition()).unwrap();
    cursor.seek_to_first().unwrap();

    let result = cursor.valid_for_prefix(b"tx:");

    assert!(matches!(result, Err(LedgerError::InvalidOperation(_))));
    // The cursor itself is unaffected
    assert!(cursor.valid());
}

#[test]
fn test_error_reporting_by_backend() {
    let (_temp, embedded) = facade_with(BackendKind::Embedded, &["a"]);
    let cursor = embedded.new_cursor(embedded.default_partition()).unwrap();
    assert!(cursor.error().unwrap().is_none());

    let (_temp2, versioned) = facade_with(BackendKind::Versioned, &["a"]);
    let cursor = versioned.new_cursor(versioned.default_partition()).unwrap();
    assert!(matches!(cursor.error(), Err(LedgerError::InvalidOperation(_))));
}

#[test]
fn test_views_borrow_only_on_embedded() {
    let (_temp, embedded) = facade_with(BackendKind::Embedded, &["a"]);
    let mut cursor = embedded.new_cursor(embedded.default_partition()).unwrap();
    cursor.seek_to_first().unwrap();
    let key = cursor.key().unwrap().unwrap();
    assert!(!key.is_owned());
    assert_eq!(key.backend(), BackendKind::Embedded);
    let detached = key.into_owned();
    cursor.next().unwrap();
    assert_eq!(detached, b"a");

    let (_temp2, versioned) = facade_with(BackendKind::Versioned, &["a"]);
    let mut cursor = versioned.new_cursor(versioned.default_partition()).unwrap();
    cursor.seek_to_first().unwrap();
    let value = cursor.value().unwrap().unwrap();
    assert!(value.is_owned());
    assert_eq!(value.backend(), BackendKind::Versioned);
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_close_twice_is_use_after_close() {
    for backend in BACKENDS {
        let (_temp, facade) = facade_with(backend, &["a"]);
        let mut cursor = facade.new_cursor(facade.default_partition()).unwrap();
        assert_eq!(cursor.backend(), Some(backend));

        cursor.close().unwrap();

        assert!(cursor.is_closed());
        assert_eq!(cursor.backend(), None);
        assert!(!cursor.valid());
        assert!(matches!(cursor.close(), Err(LedgerError::UseAfterClose(_))));
    }
}

#[test]
fn test_operations_after_close_fail() {
    for backend in BACKENDS {
        let (_temp, facade) = facade_with(backend, &["a"]);
        let mut cursor = facade.new_cursor(facade.default_partition()).unwrap();
        cursor.close().unwrap();

        assert!(matches!(cursor.seek_to_first(), Err(LedgerError::UseAfterClose(_))));
        assert!(matches!(cursor.seek(b"a"), Err(LedgerError::UseAfterClose(_))));
        assert!(matches!(cursor.next(), Err(LedgerError::UseAfterClose(_))));
        assert!(matches!(cursor.key(), Err(LedgerError::UseAfterClose(_))));
        assert!(matches!(cursor.value(), Err(LedgerError::UseAfterClose(_))));
        assert!(matches!(cursor.error(), Err(LedgerError::UseAfterClose(_))));
    }
}

#[test]
fn test_cursor_survives_drop_without_close() {
    for backend in BACKENDS {
        let (_temp, facade) = facade_with(backend, &["a"]);
        {
            let mut cursor = facade.new_cursor(facade.default_partition()).unwrap();
            cursor.seek_to_first().unwrap();
        }

        // A fresh cursor still works after the implicit release
        let mut cursor = facade.new_cursor(facade.default_partition()).unwrap();
        assert_eq!(collect_forward(&mut cursor), vec![b"a".to_vec()]);
    }
}
