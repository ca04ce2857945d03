//! Integration tests for the install bookkeeping flow through the public API.

use std::fs;

use serde_json::json;
use tempfile::TempDir;
use ucd_core::paths::{INDEX_FILE, MANIFEST_FILE};
use ucd_core::{CatalogEntry, InstalledIndex, ManifestStore, resolve_unique_path, slugify};

#[test]
fn unique_path_skips_existing_numbered_copies() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("game.zip"), b"1").unwrap();
    fs::write(tmp.path().join("game-1.zip"), b"2").unwrap();

    let resolved = resolve_unique_path(tmp.path(), "game.zip");
    assert_eq!(resolved.file_name().unwrap(), "game-2.zip");
}

#[tokio::test]
async fn provisional_to_installed_round_trip() {
    let tmp = TempDir::new().unwrap();
    let store = ManifestStore::new(tmp.path());
    let entry = CatalogEntry::new("1145360").with_name("Hades");
    let slug = slugify(entry.folder_source());

    let saved = store
        .save_provisional(&entry, Some(json!({"name": "Hades", "size": "15 GB"})))
        .await
        .unwrap();
    assert_eq!(saved.manifest_path, tmp.path().join("installing/hades").join(MANIFEST_FILE));

    let installing = store.list_installing().await.unwrap();
    assert_eq!(installing.len(), 1);
    assert_eq!(installing[0].installed_at, None);

    let source = tmp.path().join("installing/hades/hades.zip");
    fs::write(&source, vec![7u8; 4096]).unwrap();

    let (file, manifest) = store
        .finalize_and_record(&source, &slug, Some("1145360"), Some("Hades"))
        .await
        .unwrap();
    assert_eq!(file.final_path, tmp.path().join("installed/hades/hades.zip"));
    assert_eq!(manifest.files.len(), 1);
    assert_eq!(manifest.files[0].size_bytes, 4096);
    assert_eq!(manifest.metadata.as_ref().unwrap()["size"], "15 GB");

    let found = store.get_installed("1145360").await.unwrap().unwrap();
    assert_eq!(found, manifest);
}

#[tokio::test]
async fn concurrent_rebuilds_agree() {
    let tmp = TempDir::new().unwrap();
    let store = ManifestStore::new(tmp.path());

    for (slug, appid) in [("a", "1"), ("b", "2"), ("c", "3")] {
        let dir = tmp.path().join("installing").join(slug);
        fs::create_dir_all(&dir).unwrap();
        let source = dir.join(format!("{slug}.bin"));
        fs::write(&source, slug.as_bytes()).unwrap();
        store
            .finalize_and_record(&source, slug, Some(appid), None)
            .await
            .unwrap();
    }

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.rebuild_index().await.unwrap() })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().len(), 3);
    }

    let raw = fs::read(tmp.path().join("installed").join(INDEX_FILE)).unwrap();
    let index: InstalledIndex = serde_json::from_slice(&raw).unwrap();
    let folders: Vec<_> = index.entries.iter().map(|e| e.folder_name.as_str()).collect();
    assert_eq!(folders, ["a", "b", "c"]);
}
