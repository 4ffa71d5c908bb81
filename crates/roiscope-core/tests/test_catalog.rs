mod common;

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use ndarray::{Array2, IxDyn};
use roiscope_core::catalog::ItemCatalog;
use roiscope_core::error::RoiscopeError;

use common::{image, touch, write_npy_item, write_npz_item, CountingLoader};

// ---------------------------------------------------------------------------
// Directory scan
// ---------------------------------------------------------------------------

#[test]
fn test_scan_mixed_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let data = image(4, 4, |r, c| (r + c) as f64).into_dyn();
    write_npy_item(dir.path(), "item_007.npy", &data);
    touch(dir.path(), "item_12.h5");
    write_npz_item(dir.path(), "3.npz", &data);
    touch(dir.path(), "notes.txt");
    touch(dir.path(), "background.npy");

    let mut catalog = ItemCatalog::new();
    let count = catalog.set_directory(dir.path()).unwrap();
    assert_eq!(count, 3);
    assert_eq!(catalog.available_items(), vec![3, 7, 12]);
    assert_eq!(catalog.root_directory(), Some(dir.path()));
}

#[test]
fn test_scan_counts_an_item_once_across_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let data = image(2, 2, |_, _| 1.0).into_dyn();
    write_npy_item(dir.path(), "item_001.npy", &data);
    write_npz_item(dir.path(), "item_001.npz", &data);

    let mut catalog = ItemCatalog::new();
    assert_eq!(catalog.set_directory(dir.path()).unwrap(), 1);
}

#[test]
fn test_scan_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = ItemCatalog::new();
    let result = catalog.set_directory(dir.path().join("missing"));
    assert!(matches!(result, Err(RoiscopeError::InvalidDirectory(_))));
    assert!(catalog.available_items().is_empty());
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "readme.md");
    let mut catalog = ItemCatalog::new();
    assert!(matches!(
        catalog.set_directory(dir.path()),
        Err(RoiscopeError::NoItems(_))
    ));
    assert!(catalog.available_items().is_empty());
}

#[test]
fn test_rescan_replaces_items() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let data = image(2, 2, |_, _| 0.0).into_dyn();
    write_npy_item(first.path(), "item_1.npy", &data);
    write_npy_item(first.path(), "item_2.npy", &data);
    write_npy_item(second.path(), "item_9.npy", &data);

    let mut catalog = ItemCatalog::new();
    catalog.set_directory(first.path()).unwrap();
    catalog.set_directory(second.path()).unwrap();
    assert_eq!(catalog.available_items(), vec![9]);
}

// ---------------------------------------------------------------------------
// Loading and cache
// ---------------------------------------------------------------------------

#[test]
fn test_load_item_npy_and_npz() {
    let dir = tempfile::tempdir().unwrap();
    let a = image(3, 5, |r, c| (r * 5 + c) as f64).into_dyn();
    let b = image(3, 5, |r, c| (r * c) as f64 * 0.5).into_dyn();
    write_npy_item(dir.path(), "item_001.npy", &a);
    write_npz_item(dir.path(), "item_002.npz", &b);

    let mut catalog = ItemCatalog::new();
    catalog.set_directory(dir.path()).unwrap();

    let frame_a = catalog.load_item(1, false).unwrap();
    assert_eq!(frame_a.data, a);
    assert_eq!(frame_a.dtype, "<f8");
    let frame_b = catalog.load_item(2, false).unwrap();
    assert_eq!(frame_b.data, b);

    let meta = catalog.metadata(1).unwrap();
    assert_eq!(meta.shape, vec![3, 5]);
    assert_eq!(meta.byte_size, 3 * 5 * 8);
    assert!(meta.path.ends_with("item_001.npy"));
}

fn loaded_path(catalog: &mut ItemCatalog, item: u32) -> String {
    catalog.load_item(item, false).unwrap();
    let path = &catalog.metadata(item).unwrap().path;
    path.file_name().unwrap().to_string_lossy().into_owned()
}

#[test]
fn test_load_prefers_extension_before_name_pattern() {
    let dir = tempfile::tempdir().unwrap();
    write_npy_item(dir.path(), "item_001.npy", &image(2, 2, |_, _| 1.0).into_dyn());
    write_npz_item(dir.path(), "item_001.npz", &image(2, 2, |_, _| 2.0).into_dyn());
    // A plain-number .npy still beats the canonical name in a later extension.
    write_npy_item(dir.path(), "3.npy", &image(2, 2, |_, _| 3.0).into_dyn());
    write_npz_item(dir.path(), "item_003.npz", &image(2, 2, |_, _| 4.0).into_dyn());

    let mut catalog = ItemCatalog::new();
    catalog.set_directory(dir.path()).unwrap();
    assert_eq!(loaded_path(&mut catalog, 1), "item_001.npy");
    assert_eq!(catalog.load_item(1, false).unwrap().data[[0, 0]], 1.0);
    assert_eq!(loaded_path(&mut catalog, 3), "3.npy");
    assert_eq!(catalog.load_item(3, false).unwrap().data[[0, 0]], 3.0);
}

#[test]
fn test_load_prefers_padded_item_name() {
    let dir = tempfile::tempdir().unwrap();
    write_npy_item(dir.path(), "item_007.npy", &image(2, 2, |_, _| 1.0).into_dyn());
    write_npy_item(dir.path(), "7.npy", &image(2, 2, |_, _| 2.0).into_dyn());
    write_npy_item(dir.path(), "item_8.npy", &image(2, 2, |_, _| 3.0).into_dyn());
    write_npy_item(dir.path(), "008.npy", &image(2, 2, |_, _| 4.0).into_dyn());

    let mut catalog = ItemCatalog::new();
    catalog.set_directory(dir.path()).unwrap();
    assert_eq!(catalog.available_items(), vec![7, 8]);
    assert_eq!(loaded_path(&mut catalog, 7), "item_007.npy");
    assert_eq!(loaded_path(&mut catalog, 8), "item_8.npy");
}

#[test]
fn test_load_falls_back_to_scanned_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = image(2, 3, |r, c| (r + c) as f64).into_dyn();
    write_npy_item(dir.path(), "frame_0005.npy", &data);

    let mut catalog = ItemCatalog::new();
    catalog.set_directory(dir.path()).unwrap();
    assert_eq!(catalog.available_items(), vec![5]);
    assert_eq!(catalog.load_item(5, false).unwrap().data, data);
    assert_eq!(loaded_path(&mut catalog, 5), "frame_0005.npy");
}

#[test]
fn test_cached_reload_returns_same_array() {
    let dir = tempfile::tempdir().unwrap();
    write_npy_item(
        dir.path(),
        "item_004.npy",
        &image(2, 3, |r, c| (r + c) as f64).into_dyn(),
    );

    let mut catalog = ItemCatalog::with_loader(CountingLoader::default());
    catalog.set_directory(dir.path()).unwrap();

    let first = catalog.load_item(4, false).unwrap();
    let second = catalog.load_item(4, false).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(catalog.loader().calls.get(), 1);
    assert!(catalog.is_cached(4));
}

#[test]
fn test_force_reload_decodes_again() {
    let dir = tempfile::tempdir().unwrap();
    write_npy_item(dir.path(), "5.npy", &image(2, 2, |_, _| 1.0).into_dyn());

    let mut catalog = ItemCatalog::with_loader(CountingLoader::default());
    catalog.set_directory(dir.path()).unwrap();

    let first = catalog.load_item(5, false).unwrap();
    let second = catalog.load_item(5, true).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.data, second.data);
    assert_eq!(catalog.loader().calls.get(), 2);
}

#[test]
fn test_load_unknown_item() {
    let dir = tempfile::tempdir().unwrap();
    write_npy_item(dir.path(), "item_1.npy", &image(2, 2, |_, _| 1.0).into_dyn());
    let mut catalog = ItemCatalog::new();
    catalog.set_directory(dir.path()).unwrap();

    assert!(matches!(
        catalog.load_item(99, false),
        Err(RoiscopeError::ItemNotFound(99))
    ));
}

#[test]
fn test_load_hdf5_without_feature_fails() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "item_12.h5");
    let mut catalog = ItemCatalog::new();
    catalog.set_directory(dir.path()).unwrap();

    let result = catalog.load_item(12, false);
    if cfg!(feature = "hdf5") {
        assert!(result.is_err());
    } else {
        assert!(matches!(result, Err(RoiscopeError::UnsupportedFormat(_))));
    }
    assert!(!catalog.is_cached(12));
}

#[test]
fn test_clear_cache_keeps_items() {
    let dir = tempfile::tempdir().unwrap();
    write_npy_item(dir.path(), "item_1.npy", &image(2, 2, |_, _| 1.0).into_dyn());
    let mut catalog = ItemCatalog::new();
    catalog.set_directory(dir.path()).unwrap();
    catalog.load_item(1, false).unwrap();
    assert_eq!(catalog.cached_items(), vec![1]);

    catalog.clear_cache();
    assert!(catalog.cached_items().is_empty());
    assert!(catalog.metadata(1).is_none());
    assert_eq!(catalog.available_items(), vec![1]);
}

#[test]
fn test_load_multiple_skips_failures() {
    let dir = tempfile::tempdir().unwrap();
    write_npy_item(dir.path(), "item_1.npy", &image(2, 2, |_, _| 1.0).into_dyn());
    write_npy_item(dir.path(), "item_2.npy", &image(2, 2, |_, _| 2.0).into_dyn());
    let mut catalog = ItemCatalog::new();
    catalog.set_directory(dir.path()).unwrap();

    let loaded = catalog.load_multiple(&[1, 2, 3]);
    assert_eq!(loaded.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
}

// ---------------------------------------------------------------------------
// Averaging
// ---------------------------------------------------------------------------

#[test]
fn test_average_of_identical_items_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let data = image(4, 3, |r, c| (r * 3 + c) as f64 * 1.25).into_dyn();
    write_npy_item(dir.path(), "item_1.npy", &data);
    write_npy_item(dir.path(), "item_2.npy", &data);
    let mut catalog = ItemCatalog::new();
    catalog.set_directory(dir.path()).unwrap();

    let avg = catalog.average_items(&[1, 2]).unwrap();
    assert_eq!(avg, data);
}

#[test]
fn test_average_values() {
    let dir = tempfile::tempdir().unwrap();
    write_npy_item(dir.path(), "item_1.npy", &image(2, 2, |_, _| 1.0).into_dyn());
    write_npy_item(dir.path(), "item_2.npy", &image(2, 2, |_, _| 2.0).into_dyn());
    let mut catalog = ItemCatalog::new();
    catalog.set_directory(dir.path()).unwrap();

    let avg = catalog.average_items(&[1, 2, 2]).unwrap();
    for v in avg.iter() {
        assert_abs_diff_eq!(*v, 5.0 / 3.0, epsilon = 1e-12);
    }
    assert_eq!(avg.raw_dim(), IxDyn(&[2, 2]));
}

#[test]
fn test_average_shape_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    write_npy_item(dir.path(), "item_1.npy", &image(2, 2, |_, _| 1.0).into_dyn());
    write_npy_item(dir.path(), "item_2.npy", &Array2::<f64>::zeros((3, 2)).into_dyn());
    let mut catalog = ItemCatalog::new();
    catalog.set_directory(dir.path()).unwrap();

    match catalog.average_items(&[1, 2]) {
        Err(RoiscopeError::ShapeMismatch { expected, found }) => {
            assert_eq!(expected, vec![2, 2]);
            assert_eq!(found, vec![3, 2]);
        }
        other => panic!("expected shape mismatch, got {other:?}"),
    }
}

#[test]
fn test_average_nothing_loaded() {
    let dir = tempfile::tempdir().unwrap();
    write_npy_item(dir.path(), "item_1.npy", &image(2, 2, |_, _| 1.0).into_dyn());
    let mut catalog = ItemCatalog::new();
    catalog.set_directory(dir.path()).unwrap();

    assert!(matches!(
        catalog.average_items(&[8, 9]),
        Err(RoiscopeError::EmptySequence)
    ));
    assert!(matches!(
        catalog.average_items(&[]),
        Err(RoiscopeError::EmptySequence)
    ));
}
