// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for staged container commits

use neurostore_container::{AttributeMap, DatasetData, StorageManager, STAT_MEAN};
use neurostore_structures::AttrValue;
use tempfile::TempDir;

#[test]
fn uncommitted_edits_leave_file_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("TimeSeriesRegion_7.h5");

    let mut manager = StorageManager::create(&path).with_compression(false);
    manager.set_metadata(AttributeMap::from([(
        "Title".to_string(),
        AttrValue::Bytes(b"\"bold\"".to_vec()),
    )]));
    manager.store_data("data", DatasetData::from_vec_f64(vec![1.0, 3.0]));
    manager.commit().unwrap();
    let before = std::fs::read(&path).unwrap();

    let mut edited = StorageManager::open(&path).unwrap();
    edited.remove_metadata("Title");
    edited
        .set_dataset_metadata(
            "data",
            AttributeMap::from([(STAT_MEAN.to_string(), AttrValue::Float(2.0))]),
        )
        .unwrap();
    drop(edited);

    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn compressed_and_plain_files_reopen_identically() {
    let dir = TempDir::new().unwrap();
    let plain = dir.path().join("plain.h5");
    let packed = dir.path().join("packed.h5");

    let values: Vec<f64> = (0..512).map(|i| (i % 7) as f64).collect();
    for (path, compress) in [(&plain, false), (&packed, true)] {
        let mut manager = StorageManager::create(path).with_compression(compress);
        manager.store_data("weights", DatasetData::from_vec_f64(values.clone()));
        manager.commit().unwrap();
    }

    let a = StorageManager::open(&plain).unwrap();
    let b = StorageManager::open(&packed).unwrap();
    assert_eq!(a.get_data("weights").unwrap(), b.get_data("weights").unwrap());
}
