//! Classifies fetched items against the record store and applies the paired
//! store mutation. Classification itself is a pure function of the incoming
//! item and its matching record, so the freshness rules live in one place.

use crate::store::{RecordStore, StoreTx};
use crate::types::{Classification, FeedItem, FeedmailError, PersistedRecord, Result};
use chrono::Utc;
use tracing::{debug, warn};

/// Pure freshness comparison. Equality of timestamps is `Unchanged`; only a
/// strictly newer update time reclassifies an already-seen item, which keeps
/// re-polls of identical data from producing duplicate notifications.
pub fn classify(item: &FeedItem, existing: Option<&PersistedRecord>) -> Classification {
    let updated_at = match item.updated_at {
        Some(t) => t,
        None => {
            warn!("Item {} has no usable updated timestamp, treating as unchanged", item.url);
            return Classification::Unchanged;
        }
    };

    match existing {
        None => Classification::New,
        Some(record) if updated_at.naive_utc() > record.last_update => Classification::Updated,
        Some(_) => Classification::Unchanged,
    }
}

/// Looks up the item's record, classifies it, and durably applies the store
/// mutation before the caller attempts any notification. Lookup and mutation
/// run in one transaction, so the pair is a single unit of work.
pub async fn observe(store: &RecordStore, item: &FeedItem) -> Result<Classification> {
    let mut tx = store.begin().await?;
    let existing = store.find_by_url_in(&mut tx, &item.url).await?;
    let classification = apply_in(store, &mut tx, item, existing.as_ref()).await?;
    tx.commit().await?;
    Ok(classification)
}

/// Applies the mutation implied by classifying `item` against a lookup result
/// the caller already holds, in its own transaction.
///
/// A `DuplicateUrl` on insert means another task recorded the same URL after
/// that lookup; the loser reports `Unchanged` and sends nothing.
pub async fn apply(
    store: &RecordStore,
    item: &FeedItem,
    existing: Option<&PersistedRecord>,
) -> Result<Classification> {
    let mut tx = store.begin().await?;
    let classification = apply_in(store, &mut tx, item, existing).await?;
    tx.commit().await?;
    Ok(classification)
}

async fn apply_in(
    store: &RecordStore,
    tx: &mut StoreTx<'_>,
    item: &FeedItem,
    existing: Option<&PersistedRecord>,
) -> Result<Classification> {
    match (classify(item, existing), existing, item.updated_at) {
        (Classification::New, _, Some(updated_at)) => {
            match store.insert_in(tx, &item.url, updated_at, Utc::now()).await {
                Ok(id) => {
                    debug!("Recorded new item {} as id {}", item.url, id);
                    Ok(Classification::New)
                }
                Err(FeedmailError::DuplicateUrl { url }) => {
                    warn!("Lost insert race for {}, already recorded by a concurrent task", url);
                    Ok(Classification::Unchanged)
                }
                Err(e) => Err(e),
            }
        }
        (Classification::Updated, Some(record), Some(updated_at)) => {
            store
                .update_last_seen_in(tx, record.id, updated_at, Utc::now())
                .await?;
            debug!("Recorded update for item {} (id {})", item.url, record.id);
            Ok(Classification::Updated)
        }
        _ => Ok(Classification::Unchanged),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemAuthor;
    use chrono::{DateTime, TimeZone, Utc};

    fn item(url: &str, updated_at: Option<DateTime<Utc>>) -> FeedItem {
        FeedItem {
            url: url.to_string(),
            title: "title".to_string(),
            author: ItemAuthor::default(),
            categories: vec![],
            links: vec![url.to_string()],
            content: String::new(),
            published_at: None,
            updated_at,
        }
    }

    fn record(id: i64, url: &str, last_update: DateTime<Utc>) -> PersistedRecord {
        PersistedRecord {
            id,
            url: url.to_string(),
            last_update: last_update.naive_utc(),
            recorded_at: last_update.naive_utc(),
        }
    }

    #[test]
    fn unseen_item_is_new() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let item = item("http://ex.com/a", Some(t));
        assert_eq!(classify(&item, None), Classification::New);
    }

    #[test]
    fn strictly_newer_timestamp_is_updated() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let rec = record(1, "http://ex.com/a", t0);
        let item = item("http://ex.com/a", Some(t1));
        assert_eq!(classify(&item, Some(&rec)), Classification::Updated);
    }

    #[test]
    fn equal_timestamp_is_unchanged() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rec = record(1, "http://ex.com/a", t);
        let item = item("http://ex.com/a", Some(t));
        assert_eq!(classify(&item, Some(&rec)), Classification::Unchanged);
    }

    #[test]
    fn older_timestamp_is_unchanged() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rec = record(1, "http://ex.com/a", t0);
        let item = item("http://ex.com/a", Some(t1));
        assert_eq!(classify(&item, Some(&rec)), Classification::Unchanged);
    }

    #[test]
    fn missing_timestamp_is_unchanged_even_when_unseen() {
        let item = item("http://ex.com/a", None);
        assert_eq!(classify(&item, None), Classification::Unchanged);
    }
}
