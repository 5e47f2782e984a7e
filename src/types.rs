use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One syndication entry as handed back by the feed-fetch collaborator.
/// `url` is the entry's primary link and is the identity key used for
/// deduplication; `links` holds every link on the entry, `url` included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub url: String,
    pub title: String,
    pub author: ItemAuthor,
    pub categories: Vec<String>,
    pub links: Vec<String>,
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
    /// `None` means the feed carried no usable updated timestamp; such items
    /// are never reclassified and never notified.
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemAuthor {
    pub name: String,
    pub email: Option<String>,
}

/// The persisted dedup/freshness state for one item URL.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRecord {
    pub id: i64,
    pub url: String,
    /// Last-seen item update time, UTC wall clock.
    pub last_update: NaiveDateTime,
    /// When this pipeline last touched the row, UTC wall clock.
    pub recorded_at: NaiveDateTime,
}

/// Outcome of comparing a fetched item against its persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    New,
    Updated,
    Unchanged,
}

impl Classification {
    /// Only fresh observations trigger a notification.
    pub fn needs_notification(self) -> bool {
        matches!(self, Classification::New | Classification::Updated)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeedmailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed parse error: {0}")]
    Parse(String),

    #[error("fetch timed out after {seconds}s")]
    FetchTimeout { seconds: u64 },

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("record already exists for url: {url}")]
    DuplicateUrl { url: String },

    #[error("timestamp parse error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("mail delivery error: {0}")]
    Delivery(#[from] lettre::transport::smtp::Error),

    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("mail envelope error: {0}")]
    Envelope(#[from] lettre::error::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FeedmailError>;
