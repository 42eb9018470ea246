//! Integration tests for the persistent coefficient store.

use std::os::unix::fs::PermissionsExt;

use legendre::{row_length, LegendreError, PersistentStore};
use regrid_common::Grid;
use test_utils::{gaussian_n32, init_test_tracing, latlon_1_5, TempDataDir};

// =============================================================================
// File layout
// =============================================================================

#[test]
fn test_t21_n32_file_size() {
    init_test_tracing();
    let dir = TempDataDir::new();
    let store = PersistentStore::new(dir.path());
    let grid = gaussian_n32();

    let path = store.ensure_exists(21, &grid).expect("generate T21 N32");
    assert_eq!(row_length(21), 275);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 70_400);
    assert_eq!(path, dir.file("ecregrid_cf_t21_N32"));
}

#[test]
fn test_file_is_read_only_and_alone() {
    let dir = TempDataDir::new();
    let store = PersistentStore::new(dir.path());

    let path = store.ensure_exists(7, &latlon_1_5()).unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o444);
    // No temporary file left behind
    assert_eq!(dir.file_names(), vec!["ecregrid_cf_t7_R1.5".to_string()]);
}

#[test]
fn test_second_call_does_not_rewrite() {
    let dir = TempDataDir::new();
    let store = PersistentStore::new(dir.path());
    let grid = gaussian_n32();

    let path = store.ensure_exists(10, &grid).unwrap();
    let before = std::fs::metadata(&path).unwrap().modified().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));

    let again = store.ensure_exists(10, &grid).unwrap();
    let after = std::fs::metadata(&again).unwrap().modified().unwrap();
    assert_eq!(path, again);
    assert_eq!(before, after);
}

#[test]
fn test_data_dir_created_on_demand() -> anyhow::Result<()> {
    let dir = TempDataDir::new();
    let nested = dir.file("a").join("b");
    let store = PersistentStore::new(&nested);
    let path = store.ensure_exists(1, &gaussian_n32())?;
    assert_eq!(path, nested.join("ecregrid_cf_t1_N32"));
    assert_eq!(std::fs::metadata(&path)?.len(), PersistentStore::expected_size(1, 32));
    Ok(())
}

// =============================================================================
// Corruption handling
// =============================================================================

#[test]
fn test_truncated_file_is_corrupt_cache() {
    let dir = TempDataDir::new();
    let store = PersistentStore::new(dir.path());
    let grid = gaussian_n32();
    std::fs::write(store.canonical_path(21, &grid.coeff_info()), vec![0u8; 70_399]).unwrap();

    match store.ensure_exists(21, &grid) {
        Err(LegendreError::CorruptCache { expected, actual, .. }) => {
            assert_eq!(expected, 70_400);
            assert_eq!(actual, 70_399);
        }
        other => panic!("expected CorruptCache, got {:?}", other),
    }

    // A higher layer may delete and retry once
    assert!(store.remove(21, &grid).unwrap());
    let path = store.ensure_exists(21, &grid).unwrap();
    assert_eq!(std::fs::metadata(path).unwrap().len(), 70_400);
    assert!(!store.remove(3, &grid).unwrap());
}

// =============================================================================
// Concurrent writers
// =============================================================================

#[test]
fn test_racing_writers_publish_one_valid_file() {
    let dir = TempDataDir::new();
    let grid = gaussian_n32();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let store = PersistentStore::new(dir.path());
                let path = store.ensure_exists(15, &grid).expect("racing writer");
                assert_eq!(
                    std::fs::metadata(path).unwrap().len(),
                    PersistentStore::expected_size(15, grid.nshalf())
                );
            });
        }
    });

    assert_eq!(dir.file_names(), vec!["ecregrid_cf_t15_N32".to_string()]);
}
