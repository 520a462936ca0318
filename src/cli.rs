//! Command-line interface definitions for the job harvester.
//!
//! Every option can also come from the optional YAML file passed with
//! `--config`; flags given on the command line take precedence over it.

use clap::{Parser, ValueEnum};
use serde::Deserialize;

/// Posting-age filter understood by the listing site.
#[derive(ValueEnum, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostedWithin {
    #[value(name = "24h")]
    #[serde(rename = "24h")]
    Day,
    #[value(name = "7d")]
    #[serde(rename = "7d")]
    Week,
    #[value(name = "30d")]
    #[serde(rename = "30d")]
    Month,
}

impl PostedWithin {
    /// The site's own `fromage` day-count parameter.
    pub fn fromage(self) -> &'static str {
        match self {
            PostedWithin::Day => "1",
            PostedWithin::Week => "7",
            PostedWithin::Month => "30",
        }
    }
}

/// Command-line arguments for the job harvester.
///
/// # Examples
///
/// ```sh
/// # Ten office jobs from the last week
/// job_harvest --keyword office --location "United States" --posted-within 7d --results-wanted 10
///
/// # Through two rotating proxies, UK site
/// job_harvest --domain indeed.co.uk --proxy http://p1:8000 --proxy http://p2:8000
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Search keyword (free text)
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Location (free text)
    #[arg(short, long)]
    pub location: Option<String>,

    /// Only postings younger than this
    #[arg(short, long, value_enum)]
    pub posted_within: Option<PostedWithin>,

    /// Number of postings to retrieve
    #[arg(short, long)]
    pub results_wanted: Option<usize>,

    /// Number of concurrent detail workers
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Site domain; alternate country domains substitute the host
    #[arg(long)]
    pub domain: Option<String>,

    /// Proxy endpoint, rotated per attempt (repeatable)
    #[arg(long = "proxy", env = "PROXY_URLS", value_delimiter = ',')]
    pub proxies: Vec<String>,

    /// Output file for JSON Lines records
    #[arg(short, long)]
    pub output: Option<String>,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Minimum gap between any two outbound requests, in milliseconds
    #[arg(long)]
    pub min_gap_ms: Option<u64>,

    /// Visible-text length under which a detail page without a description counts as thin
    #[arg(long)]
    pub thin_text_threshold: Option<usize>,
}
