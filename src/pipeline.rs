//! Per-feed fan-out: one task per configured feed, all sharing the record
//! store, joined before the run ends. Failures stay local to the item or
//! feed that caused them.

use crate::compose;
use crate::deliver::SendMail;
use crate::detect;
use crate::fetch::FetchFeed;
use crate::store::RecordStore;
use crate::types::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info};

#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub feeds_ok: usize,
    pub feeds_failed: usize,
    pub notifications_sent: usize,
}

pub struct Pipeline {
    store: Arc<RecordStore>,
    fetcher: Arc<dyn FetchFeed>,
    mailer: Arc<dyn SendMail>,
    fetch_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        store: Arc<RecordStore>,
        fetcher: Arc<dyn FetchFeed>,
        mailer: Arc<dyn SendMail>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            mailer,
            fetch_timeout,
        }
    }

    /// Polls every feed concurrently and waits for all of them. Mid-run
    /// errors are logged with their feed or item context and never abort
    /// sibling feeds.
    pub async fn run(&self, feed_uris: &[String]) -> RunSummary {
        let mut tasks = JoinSet::new();

        for uri in feed_uris {
            let store = self.store.clone();
            let fetcher = self.fetcher.clone();
            let mailer = self.mailer.clone();
            let uri = uri.clone();
            let timeout = self.fetch_timeout;

            tasks.spawn(async move {
                let sent = poll_feed(&store, fetcher.as_ref(), mailer.as_ref(), &uri, timeout).await;
                (uri, sent)
            });
        }

        let mut summary = RunSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(sent))) => {
                    summary.feeds_ok += 1;
                    summary.notifications_sent += sent;
                }
                Ok((uri, Err(e))) => {
                    summary.feeds_failed += 1;
                    error!("Feed {} failed: {}", uri, e);
                }
                Err(e) => {
                    summary.feeds_failed += 1;
                    error!("Feed task panicked: {}", e);
                }
            }
        }

        info!(
            "Run finished: {} feed(s) ok, {} failed, {} notification(s) sent",
            summary.feeds_ok, summary.feeds_failed, summary.notifications_sent
        );
        summary
    }
}

/// Fetches one feed and pushes its items through classify -> compose -> send.
/// Returns the number of notifications delivered. A fetch failure aborts only
/// this feed; item-level failures abort only that item.
async fn poll_feed(
    store: &RecordStore,
    fetcher: &dyn FetchFeed,
    mailer: &dyn SendMail,
    uri: &str,
    timeout: Duration,
) -> Result<usize> {
    store.ensure_schema().await?;

    let items = fetcher.fetch(uri, timeout).await?;
    info!("{} item(s) in {}", items.len(), uri);

    let mut sent = 0;
    for item in &items {
        let classification = match detect::observe(store, item).await {
            Ok(c) => c,
            Err(e) => {
                error!("Skipping item {} in {}: {}", item.url, uri, e);
                continue;
            }
        };

        if !classification.needs_notification() {
            continue;
        }

        let message = compose::compose(item);
        match mailer.send(&message).await {
            Ok(()) => sent += 1,
            Err(e) => {
                // The record mutation stays in place: the item is recorded
                // but not notified, and the next poll will not resend it.
                error!("Delivery failed for item {} in {}: {}", item.url, uri, e);
            }
        }
    }

    Ok(sent)
}
