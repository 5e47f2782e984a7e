use crate::types::{FeedmailError, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 120;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub smtp: SmtpConfig,
    pub feeds: Vec<FeedConfig>,
    pub store: StoreConfig,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtpConfig {
    /// `host` or `host:port`; port defaults to 25.
    pub host: String,
    pub from: String,
    pub recipients: Vec<Recipient>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedConfig {
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// SQLite database file path.
    pub location: String,
    pub table_name: String,
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECONDS
}

impl SmtpConfig {
    /// Splits the configured host into (host, port), defaulting to port 25.
    pub fn host_and_port(&self) -> Result<(String, u16)> {
        match self.host.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    FeedmailError::Config(format!("invalid smtp port in host: {}", self.host))
                })?;
                Ok((host.to_string(), port))
            }
            None => Ok((self.host.clone(), 25)),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.smtp.recipients.is_empty() {
            return Err(FeedmailError::Config(
                "at least one smtp recipient is required".to_string(),
            ));
        }
        if self.feeds.is_empty() {
            return Err(FeedmailError::Config("no feeds configured".to_string()));
        }
        self.smtp.host_and_port()?;
        Ok(())
    }
}
