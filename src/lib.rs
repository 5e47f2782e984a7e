pub mod compose;
pub mod config;
pub mod deliver;
pub mod detect;
pub mod fetch;
pub mod pipeline;
pub mod store;
pub mod timefmt;
pub mod types;

pub use compose::EmailMessage;
pub use config::Config;
pub use deliver::{SendMail, SmtpMailer};
pub use fetch::{FetchFeed, HttpFetcher};
pub use pipeline::{Pipeline, RunSummary};
pub use store::RecordStore;
pub use types::{Classification, FeedItem, FeedmailError, ItemAuthor, PersistedRecord, Result};
