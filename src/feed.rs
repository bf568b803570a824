//! Live disruption feed client.
//!
//! The feed publishes a plaintext manifest whose last well-formed line points
//! at the most recent snapshot: a gzip-compressed tab-separated table of
//! news records tagged with themes and locations. The client downloads and
//! filters the snapshot, caches the filtered records for a TTL, and resolves
//! per-city risk signals from them.

use std::io::Read;
use std::time::{Duration, Instant};

use flate2::read::GzDecoder;
use parking_lot::Mutex;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::risk::{RiskError, RiskResolver, RiskSignal, RiskSource};

/// Themes that mark a record as a potential supply-chain disruption.
const WATCH_THEMES: &[&str] = &[
    "ENV_FLOOD",
    "STRIKE",
    "NATURAL_DISASTER",
    "TRANSPORTATION",
    "ENV_STORM",
    "PORT",
    "SHIPPING",
    "LOGISTICS",
];

/// Snapshot URLs must carry this marker to be considered.
const SNAPSHOT_MARKER: &str = "gkg";

/// Fixed column offsets for unnamed snapshot tables.
const COL_DATE: usize = 1;
const COL_SOURCE: usize = 4;
const COL_THEMES: usize = 8;
const COL_LOCATIONS: usize = 10;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("manifest contains no snapshot url")]
    NoSnapshotUrl,
    #[error("snapshot archive unreadable: {0}")]
    Archive(#[from] std::io::Error),
    #[error("fetch failed after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<FeedError>,
    },
}

/// Feed endpoint and behavior settings.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub manifest_url: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub cache_ttl_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            manifest_url: "http://data.gdeltproject.org/gdeltv2/masterfilelist-translation.txt"
                .to_string(),
            timeout_secs: 5,
            max_attempts: 2,
            cache_ttl_secs: 900,
        }
    }
}

/// Network seam: fetches manifest text and snapshot bytes. Tests substitute
/// a canned implementation.
pub trait FeedTransport {
    fn fetch_text(&self, url: &str) -> Result<String, FeedError>;
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FeedError>;
}

/// Blocking HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout_secs: u64) -> Result<Self, FeedError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

impl FeedTransport for HttpTransport {
    fn fetch_text(&self, url: &str) -> Result<String, FeedError> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

/// A snapshot record that matched the watch-list.
#[derive(Debug, Clone)]
pub struct DisruptionRecord {
    pub event_time: String,
    pub themes: Vec<String>,
    pub locations: Vec<String>,
    pub multiplier: f64,
    pub article_url: String,
}

struct CacheEntry {
    records: Vec<DisruptionRecord>,
    expires_at: Instant,
}

/// Client over the live feed with a TTL cache of filtered records.
pub struct LiveFeedClient<T> {
    config: FeedConfig,
    transport: T,
    cache: Mutex<Option<CacheEntry>>,
}

impl LiveFeedClient<HttpTransport> {
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        let transport = HttpTransport::new(config.timeout_secs)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: FeedTransport> LiveFeedClient<T> {
    pub fn with_transport(config: FeedConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            cache: Mutex::new(None),
        }
    }

    /// Current disruption records, served from cache while fresh.
    pub fn disruptions(&self) -> Result<Vec<DisruptionRecord>, FeedError> {
        {
            let cache = self.cache.lock();
            if let Some(entry) = cache.as_ref() {
                if Instant::now() < entry.expires_at {
                    return Ok(entry.records.clone());
                }
            }
        }

        let records = self.fetch_snapshot()?;
        let mut cache = self.cache.lock();
        *cache = Some(CacheEntry {
            records: records.clone(),
            expires_at: Instant::now() + Duration::from_secs(self.config.cache_ttl_secs),
        });
        Ok(records)
    }

    fn fetch_snapshot(&self) -> Result<Vec<DisruptionRecord>, FeedError> {
        let attempts = self.config.max_attempts.max(1);

        let manifest = retry(attempts, || self.transport.fetch_text(&self.config.manifest_url))?;
        let snapshot_url = latest_snapshot_url(&manifest).ok_or(FeedError::NoSnapshotUrl)?;
        debug!(url = %snapshot_url, "resolved latest snapshot");

        let archive = retry(attempts, || self.transport.fetch_bytes(&snapshot_url))?;
        let mut table = String::new();
        GzDecoder::new(archive.as_slice()).read_to_string(&mut table)?;

        let records = filter_disruptions(&table);
        info!(records = records.len(), "snapshot filtered for watch-list themes");
        Ok(records)
    }
}

impl<T: FeedTransport> RiskResolver for LiveFeedClient<T> {
    /// Highest-severity record whose location list matches `city` by
    /// case-insensitive substring.
    fn resolve_risk(&self, city: &str) -> Result<Option<RiskSignal>, RiskError> {
        let needle = city.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        let records = self.disruptions()?;
        let best = records
            .into_iter()
            .filter(|record| {
                record
                    .locations
                    .iter()
                    .any(|location| location.to_lowercase().contains(&needle))
            })
            .max_by(|a, b| a.multiplier.total_cmp(&b.multiplier));

        Ok(best.map(|record| RiskSignal {
            city: city.to_string(),
            multiplier: record.multiplier,
            reason: format!(
                "{} signal from live feed",
                record.themes.first().map(String::as_str).unwrap_or("DISRUPTION")
            ),
            source: RiskSource::Live,
            themes: record.themes,
            article_url: (!record.article_url.is_empty()).then_some(record.article_url),
        }))
    }
}

/// Run `op` up to `attempts` times, surfacing the last error when every
/// attempt fails.
fn retry<V>(attempts: u32, mut op: impl FnMut() -> Result<V, FeedError>) -> Result<V, FeedError> {
    let mut last: Option<FeedError> = None;
    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(attempt, attempts, error = %err, "feed request failed");
                last = Some(err);
            }
        }
    }
    Err(FeedError::Exhausted {
        attempts,
        source: Box::new(last.unwrap_or(FeedError::NoSnapshotUrl)),
    })
}

/// The snapshot URL from the last well-formed manifest line: at least three
/// whitespace-separated fields, third field a compressed-archive URL
/// carrying the snapshot marker.
pub fn latest_snapshot_url(manifest: &str) -> Option<String> {
    manifest
        .lines()
        .rev()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 3 {
                return None;
            }
            let candidate = fields[2];
            let lower = candidate.to_lowercase();
            (lower.contains(SNAPSHOT_MARKER) && (lower.ends_with(".gz") || lower.ends_with(".zip")))
                .then(|| candidate.to_string())
        })
        .next()
}

/// Filter the tab-separated snapshot table down to watch-listed records.
pub fn filter_disruptions(table: &str) -> Vec<DisruptionRecord> {
    let lines: Vec<&str> = table
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();

    // A header row names the theme column; data rows carry numeric dates.
    let skip_header = lines
        .first()
        .map(|line| line.contains("V2Themes") || line.contains("DATE"))
        .unwrap_or(false);

    lines
        .par_iter()
        .skip(if skip_header { 1 } else { 0 })
        .filter_map(|line| parse_record(line))
        .collect()
}

fn parse_record(line: &str) -> Option<DisruptionRecord> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() <= COL_LOCATIONS {
        return None;
    }

    let tags = theme_tags(fields[COL_THEMES]);
    let matched: Vec<String> = WATCH_THEMES
        .iter()
        .copied()
        .filter(|theme| tags.iter().any(|tag| tag_matches(tag, theme)))
        .map(str::to_string)
        .collect();
    if matched.is_empty() {
        return None;
    }

    Some(DisruptionRecord {
        event_time: fields[COL_DATE].to_string(),
        multiplier: theme_multiplier(fields[COL_THEMES]),
        locations: parse_locations(fields[COL_LOCATIONS]),
        article_url: fields[COL_SOURCE].to_string(),
        themes: matched,
    })
}

/// Severity multiplier implied by a record's theme tags.
pub fn theme_multiplier(theme_text: &str) -> f64 {
    let tags = theme_tags(theme_text);
    let has = |theme: &str| tags.iter().any(|tag| tag_matches(tag, theme));

    if ["NATURAL_DISASTER", "ENV_FLOOD", "ENV_STORM"]
        .iter()
        .any(|t| has(t))
    {
        20.0
    } else if ["TRANSPORTATION", "PORT", "SHIPPING", "LOGISTICS"]
        .iter()
        .any(|t| has(t))
    {
        10.0
    } else if has("STRIKE") {
        5.0
    } else {
        2.0
    }
}

/// Individual theme tags from a semicolon/comma-joined field, uppercased.
/// Purely numeric tokens (character offsets riding along with the tags) are
/// dropped.
fn theme_tags(raw: &str) -> Vec<String> {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && !tag.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_uppercase)
        .collect()
}

/// Whether a watch-list theme occurs in `tag` at an underscore boundary.
/// `ENV_FLOOD` matches itself, `NATURAL_DISASTER` matches
/// `NATURAL_DISASTER_FLOOD`, and `PORT` matches `MARITIME_PORT_CLOSURE` but
/// not `SPORTS` or `IMPORTS`.
fn tag_matches(tag: &str, theme: &str) -> bool {
    tag.match_indices(theme).any(|(start, _)| {
        let end = start + theme.len();
        let bytes = tag.as_bytes();
        let bounded_before = start == 0 || bytes[start - 1] == b'_';
        let bounded_after = end == tag.len() || bytes[end] == b'_';
        bounded_before && bounded_after
    })
}

/// Location names from semicolon-joined `type#name#country#...` entries.
fn parse_locations(raw: &str) -> Vec<String> {
    raw.split(';')
        .filter_map(|entry| {
            let name = entry.split('#').nth(1)?.trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}
