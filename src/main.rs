//! # Job Harvest
//!
//! Discovers job postings on a listings site that defends itself against
//! automated clients, retrieves each posting's detail page, and writes one
//! structured record per posting as JSON Lines.
//!
//! ## Usage
//!
//! ```sh
//! job_harvest -k office -l "United States" -p 7d -r 10 -o ./output/jobs.jsonl
//! ```
//!
//! ## Architecture
//!
//! The run has two sequential phases:
//! 1. **Discovery**: walk the mobile listing pages, falling back to the
//!    desktop listing pages and then the RSS feed, collecting job keys
//! 2. **Retrieval**: a small worker pool fetches each key's detail page
//!    (mobile first, desktop when the mobile page fails or is thin) and
//!    appends the extracted record to the output file
//!
//! Every outbound request passes through one shared pacer and one retrying
//! fetcher with per-attempt proxy and browser identity rotation.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod detail;
mod discovery;
mod dom;
mod engine;
mod extract;
mod fallback;
mod fetch;
mod models;
mod outputs;
mod pacer;
mod paginator;
mod pool;
mod site;
mod utils;

use cli::Cli;
use config::ScrapeConfig;
use engine::Engine;
use extract::PostingExtractor;
use fetch::proxy::{NoProxy, ProxySource, RotatingProxies};
use fetch::transport::ReqwestTransport;
use fetch::Fetcher;
use outputs::jsonl::JsonLinesSink;
use pacer::Pacer;
use utils::ensure_writable_parent;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("job_harvest starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.output, "Parsed CLI arguments");

    let config = ScrapeConfig::load(&args).await?;
    info!(
        keyword = %config.keyword,
        location = %config.location,
        posted_within = ?config.posted_within,
        results_wanted = config.results_wanted,
        concurrency = config.max_concurrency,
        domain = %config.domain,
        "Resolved configuration"
    );

    // Early check: the output file must be creatable before any request goes out.
    if let Err(e) = ensure_writable_parent(&config.output).await {
        error!(
            path = %config.output,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    let sink = JsonLinesSink::create(&config.output).await?;

    // ---- Network stack ----
    let proxies: Arc<dyn ProxySource> = if config.proxies.is_empty() {
        info!("No proxies configured; connecting directly");
        Arc::new(NoProxy)
    } else {
        let rotating = RotatingProxies::new(config.proxies.clone());
        info!(count = rotating.len(), "Rotating through configured proxies");
        Arc::new(rotating)
    };
    let pacer = Arc::new(Pacer::new(config.min_gap));
    debug!(min_gap = ?pacer.min_gap(), "Pacer ready");
    let fetcher = Fetcher::new(ReqwestTransport::new(), proxies, pacer);

    // ---- Discover and retrieve ----
    let engine = Engine::new(&config, fetcher)?;
    let summary = engine.run(&PostingExtractor, &sink).await;

    let elapsed = start_time.elapsed();
    info!(
        discovered = summary.discovered,
        attempted = summary.attempted,
        emitted = summary.emitted,
        failed = summary.failed,
        output = %sink.path(),
        elapsed_secs = elapsed.as_secs_f64(),
        "Run complete"
    );

    Ok(())
}
