//! Lockframe media prefetch binary.
//!
//! Runs one prefetch pass over a record file and logs what ended up in the
//! cache. Useful for checking a CDN and a room key outside the client.
//!
//! # Usage
//!
//! ```bash
//! # Group key from the environment (keeps it out of shell history)
//! LOCKFRAME_GROUP_KEY=<hex> lockframe-prefetch members.json
//!
//! # Tighter limits, verbose logs
//! lockframe-prefetch members.json --group-key <hex> --concurrency 2 \
//!     --attempts 3 --backoff-ms 250 --log-level debug
//! ```

mod error;
mod records;

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use error::CliError;
use lockframe_media::{
    CacheStore, DecryptingFetcher, GroupKey, HttpBlobSource, HttpConfig, ImageDecoder,
    PrefetchConfig, Prefetcher, SystemEnv,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Lockframe encrypted media prefetcher
#[derive(Parser, Debug)]
#[command(name = "lockframe-prefetch")]
#[command(about = "Fetch, decrypt and cache encrypted room media")]
#[command(version)]
struct Args {
    /// JSON file with member records
    records: PathBuf,

    /// Room group key (hex)
    #[arg(long, env = "LOCKFRAME_GROUP_KEY", hide_env_values = true)]
    group_key: String,

    /// Maximum concurrent fetches
    #[arg(long, default_value = "4")]
    concurrency: usize,

    /// Attempts per asset, including the first
    #[arg(long, default_value = "2")]
    attempts: u32,

    /// Pause between attempts, in milliseconds
    #[arg(long, default_value = "1000")]
    backoff_ms: u64,

    /// HTTP request timeout, in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Largest accepted ciphertext, in bytes
    #[arg(long, default_value = "16777216")]
    max_body_bytes: usize,

    /// Downscale decoded images to at most this many pixels per side
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    run(args).await?;
    Ok(())
}

async fn run(args: Args) -> Result<(), CliError> {
    let records = records::load(&args.records)?;
    let group_key = hex::decode(args.group_key.trim())
        .map(GroupKey::new)
        .map_err(|source| CliError::Hex { identifier: String::new(), field: "group key", source })?;

    tracing::info!(records = records.len(), path = %args.records.display(), "loaded member records");

    let source = HttpBlobSource::new(&HttpConfig {
        timeout: Duration::from_secs(args.timeout_secs),
        max_body_bytes: Some(args.max_body_bytes),
        ..HttpConfig::default()
    })?;

    let decoder = match args.max_dimension {
        Some(limit) => ImageDecoder::with_max_dimension(limit),
        None => ImageDecoder::new(),
    };

    let config = PrefetchConfig {
        max_concurrent_fetches: args.concurrency,
        max_attempts: args.attempts,
        retry_backoff: Duration::from_millis(args.backoff_ms),
    };

    let cache = CacheStore::new();
    let mut changes = cache.subscribe();
    let prefetcher = Prefetcher::new(
        DecryptingFetcher::new(source),
        decoder,
        cache.clone(),
        SystemEnv::new(),
        config,
    );

    let report = prefetcher.prefetch_all(&records, &group_key).await;

    while let Ok(change) = changes.try_recv() {
        tracing::debug!(identifier = %change.identifier, url = ?change.new_url, "cache updated");
    }

    for identifier in cache.identifiers() {
        if let Some(entry) = cache.get(&identifier) {
            tracing::info!(
                %identifier,
                width = entry.asset.width(),
                height = entry.asset.height(),
                url = %entry.source_url,
                "cached"
            );
        }
    }

    for failure in &report.failed {
        tracing::error!(
            identifier = %failure.identifier,
            category = failure.error.category(),
            error = %failure.error,
            "not cached"
        );
    }

    tracing::info!(
        requested = report.requested,
        fetched = report.fetched.len(),
        failed = report.failed.len(),
        "prefetch complete"
    );

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::Incomplete { failed: report.failed.len(), requested: report.requested })
    }
}
