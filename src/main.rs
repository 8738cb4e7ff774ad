//! quotegate - cached read-through gateway for stock quotes
//!
//! A small HTTP server that fronts a rate-limited quote API. Fresh cached
//! quotes are served locally, an upstream throttle signal opens a global
//! back-off window, and any upstream failure falls back to the last cached
//! quote rather than an error.
//!
//! # Usage
//!
//! ```sh
//! QUOTEGATE_API_KEY=demo quotegate --symbol AAPL --ttl 60
//! ```
//!
//! The server exposes:
//! - `GET /api/quote` - The configured symbol's latest quote
//! - `POST /api/admin/reset-limit` - Clear the rate limit window
//! - `GET /health` - Health check endpoint

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use quotegate::cache::{DiskCache, QuoteStore};
use quotegate::cli::{Cli, ServiceConfig};
use quotegate::data::UpstreamClient;
use quotegate::limiter::RateLimiter;
use quotegate::server::create_router;
use quotegate::service::QuoteService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quotegate=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_cli(&cli).context("invalid configuration")?;

    if config.credential.is_empty() {
        warn!("no upstream credential configured; quote requests will fail until QUOTEGATE_API_KEY is set");
    }

    let disk = if cli.no_disk_cache {
        None
    } else {
        let disk = DiskCache::new();
        if disk.is_none() {
            warn!("no usable cache directory; cached quotes will not survive restarts");
        }
        disk
    };

    let store = QuoteStore::new(disk.clone());
    let limiter = RateLimiter::new(disk);

    let mut upstream = UpstreamClient::new(config.credential.clone());
    if let Some(base_url) = &cli.upstream_url {
        info!(%base_url, "using upstream base URL override");
        upstream = upstream.with_base_url(base_url.clone());
    }

    info!(
        symbol = %config.symbol,
        ttl_secs = config.cache_ttl.num_seconds(),
        cooldown_secs = config.limit_cooldown.num_seconds(),
        "starting quote gateway"
    );

    let service = Arc::new(QuoteService::new(config, store, limiter, upstream));
    let app = create_router(service);

    let addr: SocketAddr = cli.bind.parse().context("invalid bind address")?;
    info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
