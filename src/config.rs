//! Resolved run configuration.
//!
//! Values come from three layers, lowest precedence first: built-in
//! defaults, an optional YAML file, and command-line flags.

use crate::cli::{Cli, PostedWithin};
use crate::site::{SearchQuery, Site, DEFAULT_DOMAIN};
use chrono::Local;
use serde::Deserialize;
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const DEFAULT_RESULTS_WANTED: usize = 100;
pub const DEFAULT_CONCURRENCY: usize = 2;
pub const DEFAULT_MIN_GAP_MS: u64 = 1100;
pub const DEFAULT_THIN_TEXT_THRESHOLD: usize = 80;

/// Shape of the optional YAML config file. Every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub posted_within: Option<PostedWithin>,
    pub results_wanted: Option<usize>,
    pub max_concurrency: Option<usize>,
    pub domain: Option<String>,
    pub proxies: Option<Vec<String>>,
    pub output: Option<String>,
    pub min_gap_ms: Option<u64>,
    pub thin_text_threshold: Option<usize>,
    pub primary_max_pages: Option<usize>,
    pub secondary_max_pages: Option<usize>,
}

/// Everything the engine needs for one run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub keyword: String,
    pub location: String,
    pub posted_within: PostedWithin,
    pub results_wanted: usize,
    pub max_concurrency: usize,
    pub domain: String,
    pub proxies: Vec<String>,
    pub output: String,
    pub min_gap: Duration,
    pub thin_text_threshold: usize,
    pub primary_max_pages: usize,
    pub secondary_max_pages: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            keyword: "office".to_string(),
            location: "United States".to_string(),
            posted_within: PostedWithin::Week,
            results_wanted: DEFAULT_RESULTS_WANTED,
            max_concurrency: DEFAULT_CONCURRENCY,
            domain: DEFAULT_DOMAIN.to_string(),
            proxies: Vec::new(),
            output: format!("./output/jobs_{}.jsonl", Local::now().format("%Y-%m-%d_%H%M%S")),
            min_gap: Duration::from_millis(DEFAULT_MIN_GAP_MS),
            thin_text_threshold: DEFAULT_THIN_TEXT_THRESHOLD,
            primary_max_pages: 30,
            secondary_max_pages: 25,
        }
    }
}

impl ScrapeConfig {
    /// Resolve the configuration from parsed CLI arguments, reading the YAML
    /// file named by `--config` when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if the
    /// resolved values fail validation.
    #[instrument(level = "info", skip_all)]
    pub async fn load(cli: &Cli) -> Result<Self, Box<dyn Error>> {
        let file = match &cli.config {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path).await?;
                info!(%path, "Loaded config file");
                serde_yaml::from_str::<FileConfig>(&raw)?
            }
            None => FileConfig::default(),
        };
        Self::resolve(file, cli)
    }

    /// Layer `file` and then `cli` over the defaults and validate the result.
    pub fn resolve(file: FileConfig, cli: &Cli) -> Result<Self, Box<dyn Error>> {
        let d = ScrapeConfig::default();
        let proxies = if !cli.proxies.is_empty() {
            cli.proxies.clone()
        } else {
            file.proxies.unwrap_or_default()
        };

        let mut config = ScrapeConfig {
            keyword: cli.keyword.clone().or(file.keyword).unwrap_or(d.keyword),
            location: cli.location.clone().or(file.location).unwrap_or(d.location),
            posted_within: cli.posted_within.or(file.posted_within).unwrap_or(d.posted_within),
            results_wanted: cli
                .results_wanted
                .or(file.results_wanted)
                .unwrap_or(d.results_wanted),
            max_concurrency: cli
                .max_concurrency
                .or(file.max_concurrency)
                .unwrap_or(d.max_concurrency),
            domain: cli.domain.clone().or(file.domain).unwrap_or(d.domain),
            proxies: proxies
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            output: cli.output.clone().or(file.output).unwrap_or(d.output),
            min_gap: cli
                .min_gap_ms
                .or(file.min_gap_ms)
                .map(Duration::from_millis)
                .unwrap_or(d.min_gap),
            thin_text_threshold: cli
                .thin_text_threshold
                .or(file.thin_text_threshold)
                .unwrap_or(d.thin_text_threshold),
            primary_max_pages: file.primary_max_pages.unwrap_or(d.primary_max_pages),
            secondary_max_pages: file.secondary_max_pages.unwrap_or(d.secondary_max_pages),
        };

        if config.results_wanted == 0 {
            return Err("results_wanted must be a positive integer".into());
        }
        if config.max_concurrency == 0 {
            warn!("max_concurrency of 0 requested; clamping to 1");
            config.max_concurrency = 1;
        }
        // Fail early on a domain that cannot form a URL.
        Site::new(&config.domain)?;

        Ok(config)
    }

    pub fn query(&self) -> SearchQuery {
        SearchQuery {
            keyword: self.keyword.trim().to_string(),
            location: self.location.trim().to_string(),
            fromage: self.posted_within.fromage().to_string(),
        }
    }

    pub fn site(&self) -> Result<Site, url::ParseError> {
        Site::new(&self.domain)
    }
}
