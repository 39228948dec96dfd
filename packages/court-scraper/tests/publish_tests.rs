//! End-to-end runs on the filesystem, through to the curated output.

mod common;

use std::sync::Arc;

use common::{context, orchestrator, query, DATASET_KEY};
use court_scraper::testing::{candidate, MockEnricher, MockSearcher};
use court_scraper::{
    publish_to, CheckpointStore, CuratedDataset, Detail, FilterRule, FsStorage, Predicate,
    PublishTargets,
};

fn targets() -> PublishTargets {
    PublishTargets {
        curated: "data/courts.json".to_string(),
        mirrors: vec!["docs/courts.json".to_string()],
    }
}

#[tokio::test]
async fn full_run_on_disk_writes_dataset_photos_and_curated_files() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FsStorage::new(dir.path());
    let searcher = Arc::new(MockSearcher::new().with_results(
        query("CityA"),
        vec![candidate("X", "Downtown Pickleball"), candidate("Y", "Beach Rental Courts")],
    ));
    let enricher = Arc::new(
        MockEnricher::new()
            .with_details(
                "X",
                Detail {
                    rating: Some(4.6),
                    website: Some("https://downtown.example".into()),
                    photo_ref: Some("places/X/photos/1".into()),
                    ..Default::default()
                },
            )
            .with_photo("X", b"jpeg-bytes", "jpg"),
    );

    let mut orch = orchestrator(&searcher, &enricher, storage.clone(), context(&["CityA"], 10, 10)).await;
    let summary = orch.run().await.unwrap();
    assert_eq!(summary.enriched, 2);
    assert_eq!(summary.photos_saved, 1);

    let store = orch.into_store();
    let predicate = Predicate::allow_all().with_rule(FilterRule::exclude_name("Rental"));
    let curated = publish_to(&storage, store.dataset(), &predicate, &targets())
        .await
        .unwrap();

    assert_eq!(std::fs::read(dir.path().join("data/photos/X.jpg")).unwrap(), b"jpeg-bytes");
    assert!(dir.path().join(DATASET_KEY).exists());

    let on_disk: CuratedDataset =
        serde_json::from_slice(&std::fs::read(dir.path().join("data/courts.json")).unwrap()).unwrap();
    assert_eq!(on_disk, curated);
    assert_eq!(on_disk.courts.len(), 1);
    assert_eq!(on_disk.courts[0].place_id, "X");
    assert_eq!(on_disk.courts[0].photo.as_deref(), Some("data/photos/X.jpg"));
    assert_eq!(
        std::fs::read(dir.path().join("docs/courts.json")).unwrap(),
        std::fs::read(dir.path().join("data/courts.json")).unwrap()
    );

    // The rejected place is still in the full dataset.
    let reloaded = CheckpointStore::load(FsStorage::new(dir.path()), DATASET_KEY)
        .await
        .unwrap();
    assert!(reloaded.dataset().places.contains_key("Y"));
    assert!(reloaded.has_searched(&query("CityA")));
}

#[tokio::test]
async fn corrupt_dataset_on_disk_is_preserved_and_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("data")).unwrap();
    std::fs::write(dir.path().join(DATASET_KEY), b"{\"version\": 1, \"places\": [").unwrap();

    let searcher = Arc::new(MockSearcher::new().with_results(query("CityA"), vec![candidate("X", "Court X")]));
    let enricher = Arc::new(MockEnricher::new());

    let mut orch = orchestrator(&searcher, &enricher, FsStorage::new(dir.path()), context(&["CityA"], 10, 0)).await;
    orch.run().await.unwrap();

    let backup = dir.path().join("data/courts_full.json.corrupt");
    assert_eq!(std::fs::read(backup).unwrap(), b"{\"version\": 1, \"places\": [");
    assert_eq!(orch.store().dataset().places.len(), 1);
}

#[tokio::test]
async fn republishing_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FsStorage::new(dir.path());
    let searcher = Arc::new(MockSearcher::new().with_results(
        query("CityA"),
        vec![candidate("X", "Court X"), candidate("Y", "Court Y")],
    ));
    let enricher = Arc::new(MockEnricher::new());

    let mut orch = orchestrator(&searcher, &enricher, storage.clone(), context(&["CityA"], 10, 1)).await;
    orch.run().await.unwrap();
    let store = orch.into_store();

    publish_to(&storage, store.dataset(), &Predicate::default(), &targets())
        .await
        .unwrap();
    let first = std::fs::read(dir.path().join("data/courts.json")).unwrap();

    publish_to(&storage, store.dataset(), &Predicate::default(), &targets())
        .await
        .unwrap();
    let second = std::fs::read(dir.path().join("data/courts.json")).unwrap();

    assert_eq!(first, second);
}
