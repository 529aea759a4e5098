//! Resilient Cache CLI
//!
//! Fetches JSON endpoints through the retrying fetcher and keeps the results
//! in the file-backed LRU cache.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resilient_cache::{BoundedCache, Config, FileStore, ResilientFetcher};

#[derive(Parser, Debug)]
#[command(name = "resilient_cache", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print an endpoint's JSON, from cache when present
    Fetch {
        /// Endpoint relative to API_BASE_URL, e.g. /hot-content
        endpoint: String,
        /// Skip the cache lookup and fetch again
        #[arg(long)]
        refresh: bool,
    },
    /// Print a cached value
    Get { key: String },
    /// Drop a cached value
    Remove { key: String },
    /// Drop every cached value
    Clear,
    /// Show storage usage
    Info,
}

/// Startup sequence:
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the file-backed cache
/// 4. Run the requested command
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resilient_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    info!(
        max_storage_size = config.max_storage_size,
        max_retries = config.max_retries,
        base_delay_ms = config.base_delay_ms,
        max_delay_ms = config.max_delay_ms,
        cache_dir = %config.cache_dir.display(),
        "Configuration loaded"
    );

    let store = FileStore::open(&config.cache_dir)
        .with_context(|| format!("opening cache directory {}", config.cache_dir.display()))?;
    let mut cache = BoundedCache::open(store, config.cache());

    match cli.command {
        Command::Fetch { endpoint, refresh } => {
            let cached = if refresh {
                None
            } else {
                cache.get::<Value>(&endpoint)
            };

            let value = match cached {
                Some(value) => {
                    info!(endpoint = %endpoint, "Served from cache");
                    value
                }
                None => {
                    let fetcher = ResilientFetcher::from_config(&config)?;
                    let value: Value = fetcher
                        .get_json(&endpoint)
                        .await
                        .with_context(|| format!("fetching {}", endpoint))?;
                    cache.set(&endpoint, &value);
                    value
                }
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Get { key } => match cache.get::<Value>(&key) {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => anyhow::bail!("'{}' is not cached", key),
        },
        Command::Remove { key } => cache.remove(&key),
        Command::Clear => cache.clear(),
        Command::Info => {
            let report = serde_json::json!({
                "storage": cache.storage_info(),
                "stats": cache.stats(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
