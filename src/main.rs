use clap::Parser;
use feedmail::{Config, HttpFetcher, Pipeline, RecordStore, SmtpMailer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "feedmail", about = "Polls syndication feeds and mails new or updated items")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(default_value = "feedmail.json")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    info!("Loading configuration from {}", args.config);
    let config = Config::load(&args.config).map_err(|e| {
        error!("Failed to load configuration {}: {}", args.config, e);
        anyhow::anyhow!(e)
    })?;

    let store = Arc::new(RecordStore::connect(&config.store.location, &config.store.table_name).await?);
    let fetcher = Arc::new(HttpFetcher::new());
    let mailer = Arc::new(SmtpMailer::new(config.smtp.clone())?);

    let pipeline = Pipeline::new(
        store,
        fetcher,
        mailer,
        Duration::from_secs(config.fetch_timeout_seconds),
    );

    let feed_uris: Vec<String> = config.feeds.iter().map(|f| f.uri.clone()).collect();
    info!("Polling {} feed(s)", feed_uris.len());

    // Mid-run failures are logged per feed/item; only a configuration
    // failure changes the process exit code.
    pipeline.run(&feed_uris).await;

    Ok(())
}
