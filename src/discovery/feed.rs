//! Lightweight feed surface: RSS entries carrying job links.
//!
//! Entries are structured, so keys come straight from each `<link>` and the
//! entry title and `pubDate` become the seed. Entry links are only read for
//! their `jk` parameter and never requested; they often point at
//! click-tracking paths.

use super::pattern::RawPattern;
use super::{KeyExtractor, ListingDocument};
use crate::models::{DetailTarget, JobKey, Seed};
use crate::utils::{non_empty, normalize_ws};
use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::warn;
use url::Url;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    guid: Option<String>,
}

/// Read the `jk` query parameter from any URL, whatever its path.
fn jk_param(link: &str) -> Option<JobKey> {
    let url = Url::parse(link.trim())
        .or_else(|_| Url::parse("https://localhost/").and_then(|b| b.join(link.trim())))
        .ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "jk")
        .and_then(|(_, v)| JobKey::parse(&v))
}

/// Split `"Title - Company - Location"` into seed fields.
///
/// The first part is the title. Two parts are title and company; with three
/// or more the last is the location and the one before it the company.
fn seed_from_title(raw: &str, pub_date: Option<&str>) -> Seed {
    let title = normalize_ws(raw);
    let parts: Vec<String> = title
        .split(" - ")
        .filter_map(non_empty)
        .collect();
    Seed {
        title: parts.first().cloned().or_else(|| non_empty(&title)),
        company: match parts.len() {
            0 | 1 => None,
            2 => Some(parts[1].clone()),
            n => Some(parts[n - 2].clone()),
        },
        location: (parts.len() >= 3).then(|| parts[parts.len() - 1].clone()),
        date_posted: pub_date.and_then(non_empty),
    }
}

/// Targets from a feed document, in entry order, at most `wanted` of them.
///
/// A feed that does not deserialize still yields bare keys through the
/// raw-pattern strategy.
pub fn parse_feed(xml: &str, wanted: usize) -> Vec<DetailTarget> {
    let rss: Rss = match from_str(xml) {
        Ok(rss) => rss,
        Err(e) => {
            warn!(error = %e, "Feed is not well-formed XML; scanning raw text for keys");
            let doc = ListingDocument::parse(xml);
            return RawPattern
                .extract(&doc)
                .into_iter()
                .take(wanted)
                .map(DetailTarget::new)
                .collect();
        }
    };

    let mut targets: Vec<DetailTarget> = Vec::new();
    for item in rss.channel.item {
        if targets.len() >= wanted {
            break;
        }
        let key = item
            .link
            .as_deref()
            .and_then(jk_param)
            .or_else(|| item.guid.as_deref().and_then(jk_param));
        let Some(key) = key else { continue };
        if targets.iter().any(|t| t.key == key) {
            continue;
        }
        let seed = seed_from_title(item.title.as_deref().unwrap_or_default(), item.pub_date.as_deref());
        targets.push(DetailTarget { key, seed });
    }
    targets
}
