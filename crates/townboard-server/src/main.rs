//! # townboard-server
//!
//! Community directory and moderation portal.
//!
//! This binary provides:
//! - **Member registration** and member-gated **business / vendor listings**
//!   with a visibility window that starts when the moderator approves them
//! - A **showcase wall**, **ratings** and **support tickets**
//! - A **moderator API** (HTTP Basic) to approve, reject and extend records
//! - **Per-IP rate limiting** on the public routes

mod api;
mod auth;
mod config;
mod directory;
mod error;
mod rate_limit;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;
use tracing_subscriber::EnvFilter;

use townboard_shared::SystemClock;
use townboard_store::{CachedStore, RetryingStore, SqliteTableStore, Tables};

use crate::api::AppState;
use crate::auth::Moderator;
use crate::config::{DatabaseLocation, ServerConfig};
use crate::directory::Directory;
use crate::rate_limit::RateLimiter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,townboard_server=debug")),
        )
        .init();

    info!("Starting Townboard server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    info!(
        instance = %config.instance_name,
        moderation_enabled = config.moderator.is_some(),
        one_rating_per_rater = config.ratings_one_per_rater,
        "Portal settings"
    );

    // -----------------------------------------------------------------------
    // 3. Open the record store: sqlite -> retry -> read cache
    // -----------------------------------------------------------------------
    let sqlite = match &config.database {
        DatabaseLocation::Default => SqliteTableStore::new()?,
        DatabaseLocation::Path(path) => SqliteTableStore::open_at(path)?,
        DatabaseLocation::InMemory => {
            tracing::warn!("Using an in-memory store; all records are lost on exit");
            SqliteTableStore::open_in_memory()?
        }
    };
    let store = Arc::new(CachedStore::new(
        RetryingStore::new(sqlite, config.retry_policy()),
        config.cache_ttl,
    ));
    let tables = Arc::new(Tables::new(store.clone()));

    let reports = tables.ensure_schema()?;
    for report in &reports {
        info!(
            table = %report.table,
            rows = report.rows,
            created = report.created,
            header_written = report.header_written,
            "Table ready"
        );
    }

    let directory = Directory::new(tables, Arc::new(SystemClock))
        .with_one_rating_per_rater(config.ratings_one_per_rater);

    let rate_limiter = RateLimiter::new(config.rate_limit_per_sec, config.rate_limit_burst);

    let app_state = AppState {
        directory: Arc::new(directory),
        moderator: Arc::new(Moderator::new(config.moderator.clone())),
        rate_limiter: rate_limiter.clone(),
        config: Arc::new(config.clone()),
        started_at: Instant::now(),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min)
    let rl = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale(Duration::from_secs(600)).await;
        }
    });

    // Periodic read cache cleanup
    if !config.cache_ttl.is_zero() {
        let cache = store.clone();
        let every = config.cache_ttl.max(Duration::from_secs(60));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                cache.purge_expired();
            }
        });
    }

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
