use crate::types::{FeedItem, FeedmailError, ItemAuthor, Result};
use async_trait::async_trait;
use chrono::Utc;
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Capability interface for pulling one feed's current item set. The
/// pipeline depends only on this trait, so tests drive it with deterministic
/// item batches instead of the network.
#[async_trait]
pub trait FetchFeed: Send + Sync {
    async fn fetch(&self, uri: &str, timeout: Duration) -> Result<Vec<FeedItem>>;
}

/// HTTP collaborator: downloads the feed document and hands back structured
/// items. Entries without a primary link carry no identity and are dropped.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(concat!("feedmail/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    async fn fetch_inner(&self, uri: &str) -> Result<Vec<FeedItem>> {
        debug!("Fetching feed: {}", uri);

        let response = self.client.get(uri).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedmailError::Parse(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let content = response.bytes().await?;
        let feed = parser::parse(content.as_ref())
            .map_err(|e| FeedmailError::Parse(format!("Failed to parse feed: {}", e)))?;

        let mut items = Vec::with_capacity(feed.entries.len());
        for entry in feed.entries {
            if let Some(item) = convert_entry(entry) {
                items.push(item);
            }
        }

        info!("Fetched {} item(s) from {}", items.len(), uri);
        Ok(items)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchFeed for HttpFetcher {
    async fn fetch(&self, uri: &str, timeout: Duration) -> Result<Vec<FeedItem>> {
        match tokio::time::timeout(timeout, self.fetch_inner(uri)).await {
            Ok(result) => result,
            Err(_) => Err(FeedmailError::FetchTimeout {
                seconds: timeout.as_secs(),
            }),
        }
    }
}

fn convert_entry(entry: feed_rs::model::Entry) -> Option<FeedItem> {
    let links: Vec<String> = entry.links.iter().map(|l| l.href.clone()).collect();
    let url = match links.first() {
        Some(url) => url.clone(),
        None => {
            debug!("Skipping entry without a primary link: {}", entry.id);
            return None;
        }
    };

    let title = entry
        .title
        .map(|t| t.content)
        .unwrap_or_else(|| "Untitled".to_string());

    let author = entry
        .authors
        .first()
        .map(|person| ItemAuthor {
            name: person.name.clone(),
            email: person.email.clone(),
        })
        .unwrap_or_default();

    let categories = entry.categories.into_iter().map(|c| c.term).collect();

    // Prefer full content, fall back to the summary.
    let content = entry
        .content
        .and_then(|c| c.body)
        .or_else(|| entry.summary.map(|s| s.content))
        .unwrap_or_default();

    Some(FeedItem {
        url,
        title,
        author,
        categories,
        links,
        content,
        published_at: entry.published.map(|dt| dt.with_timezone(&Utc)),
        updated_at: entry.updated.map(|dt| dt.with_timezone(&Utc)),
    })
}
