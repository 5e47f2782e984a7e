use chrono::{DateTime, TimeZone, Utc};
use feedmail::{detect, Classification, FeedItem, ItemAuthor, RecordStore};
use std::sync::Arc;

fn item(url: &str, updated_at: Option<DateTime<Utc>>) -> FeedItem {
    FeedItem {
        url: url.to_string(),
        title: "An item".to_string(),
        author: ItemAuthor {
            name: "author".to_string(),
            email: None,
        },
        categories: vec![],
        links: vec![url.to_string()],
        content: "body".to_string(),
        published_at: None,
        updated_at,
    }
}

async fn memory_store() -> RecordStore {
    let store = RecordStore::connect(":memory:", "feedmail").await.unwrap();
    store.ensure_schema().await.unwrap();
    store
}

#[tokio::test]
async fn freshness_ladder_new_unchanged_updated_unchanged() {
    let store = memory_store().await;
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

    // First sighting creates the record.
    let first = item("http://ex.com/a", Some(t0));
    assert_eq!(
        detect::observe(&store, &first).await.unwrap(),
        Classification::New
    );
    let record = store.find_by_url("http://ex.com/a").await.unwrap().unwrap();
    assert_eq!(record.last_update, t0.naive_utc());

    // Identical re-fetch is unchanged: equal timestamps never reclassify.
    assert_eq!(
        detect::observe(&store, &first).await.unwrap(),
        Classification::Unchanged
    );

    // Strictly newer timestamp reclassifies exactly once.
    let newer = item("http://ex.com/a", Some(t1));
    assert_eq!(
        detect::observe(&store, &newer).await.unwrap(),
        Classification::Updated
    );
    let record = store.find_by_url("http://ex.com/a").await.unwrap().unwrap();
    assert_eq!(record.last_update, t1.naive_utc());

    assert_eq!(
        detect::observe(&store, &newer).await.unwrap(),
        Classification::Unchanged
    );
}

#[tokio::test]
async fn older_timestamp_never_reclassifies() {
    let store = memory_store().await;
    let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    detect::observe(&store, &item("http://ex.com/a", Some(t0)))
        .await
        .unwrap();
    assert_eq!(
        detect::observe(&store, &item("http://ex.com/a", Some(t1)))
            .await
            .unwrap(),
        Classification::Unchanged
    );

    // The stored timestamp never moves backwards.
    let record = store.find_by_url("http://ex.com/a").await.unwrap().unwrap();
    assert_eq!(record.last_update, t0.naive_utc());
}

#[tokio::test]
async fn missing_timestamp_is_unchanged_and_unrecorded() {
    let store = memory_store().await;

    assert_eq!(
        detect::observe(&store, &item("http://ex.com/a", None))
            .await
            .unwrap(),
        Classification::Unchanged
    );
    assert!(store.find_by_url("http://ex.com/a").await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_observers_of_one_url_record_it_once() {
    let store = Arc::new(memory_store().await);
    let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    // Lookup and mutation share one transaction, so two tasks observing the
    // same URL serialize: exactly one winner classifies it as new.
    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = store.clone();
        let observed = item("http://ex.com/shared", Some(t));
        handles.push(tokio::spawn(async move {
            detect::observe(&store, &observed).await
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap().unwrap());
    }

    let new_count = outcomes
        .iter()
        .filter(|c| **c == Classification::New)
        .count();
    assert_eq!(new_count, 1);
    assert!(outcomes
        .iter()
        .all(|c| matches!(c, Classification::New | Classification::Unchanged)));

    let record = store
        .find_by_url("http://ex.com/shared")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.last_update, t.naive_utc());
}

#[tokio::test]
async fn lost_insert_race_degrades_to_unchanged() {
    let store = memory_store().await;
    let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    // A concurrent task records the URL between our lookup and our insert:
    // replay that by applying with a stale (absent) lookup result.
    store.insert("http://ex.com/a", t, t).await.unwrap();

    let outcome = detect::apply(&store, &item("http://ex.com/a", Some(t)), None)
        .await
        .unwrap();
    assert_eq!(outcome, Classification::Unchanged);
}
