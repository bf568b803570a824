//! Risk signals and their resolution strategies.
//!
//! A resolver either finds a risk signal for a city, finds nothing (a valid,
//! non-error outcome), or fails. The [`FallbackResolver`] composes a
//! preferred resolver with a fallback so that live-feed failures degrade to
//! the static keyword monitor instead of propagating.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::feed::FeedError;

/// Where a risk signal was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskSource {
    Live,
    Static,
}

impl RiskSource {
    pub fn label(self) -> &'static str {
        match self {
            RiskSource::Live => "live",
            RiskSource::Static => "static",
        }
    }
}

/// A resolved risk for a destination: a cost multiplier plus attribution.
#[derive(Debug, Clone)]
pub struct RiskSignal {
    pub city: String,
    pub multiplier: f64,
    pub reason: String,
    pub source: RiskSource,
    pub themes: Vec<String>,
    pub article_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum RiskError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("news corpus unreadable: {0}")]
    Corpus(#[from] std::io::Error),
}

/// Resolves the current risk for a destination city.
pub trait RiskResolver {
    fn resolve_risk(&self, city: &str) -> Result<Option<RiskSignal>, RiskError>;
}

/// Keyword weights for the static monitor; highest matching weight wins.
const RISK_WEIGHTS: &[(&str, f64)] = &[
    ("collapse", 20.0),
    ("closed", 20.0),
    ("failure", 20.0),
    ("earthquake", 20.0),
    ("fire", 10.0),
    ("flood", 10.0),
    ("spill", 10.0),
    ("accident", 10.0),
    ("strike", 5.0),
    ("protest", 5.0),
    ("delay", 2.0),
    ("traffic", 2.0),
];

#[derive(Debug, Deserialize)]
struct NewsRecord {
    #[serde(default)]
    headline: String,
    #[serde(default)]
    short_description: String,
}

/// Static fallback: scans a local corpus of short news records for the city
/// name (case-insensitive literal substring) and returns the heaviest
/// matching keyword.
#[derive(Debug, Default)]
pub struct StaticRiskMonitor {
    /// Lowercased headline + description per record.
    records: Vec<String>,
}

impl StaticRiskMonitor {
    /// Load a JSON-lines news corpus, skipping rows that do not parse.
    pub fn from_json_lines(path: impl AsRef<Path>) -> Result<Self, RiskError> {
        let text = fs::read_to_string(path)?;
        let records = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<NewsRecord>(line).ok())
            .map(|record| {
                format!("{} {}", record.headline, record.short_description).to_lowercase()
            })
            .collect();
        Ok(Self { records })
    }

    /// Build a monitor over in-memory records (test harnesses, embedded
    /// corpora).
    pub fn with_records(records: impl IntoIterator<Item = String>) -> Self {
        Self {
            records: records.into_iter().map(|r| r.to_lowercase()).collect(),
        }
    }
}

impl RiskResolver for StaticRiskMonitor {
    fn resolve_risk(&self, city: &str) -> Result<Option<RiskSignal>, RiskError> {
        let needle = city.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        let mut best: Option<(&str, f64)> = None;
        for record in self.records.iter().filter(|r| r.contains(&needle)) {
            for &(keyword, weight) in RISK_WEIGHTS {
                if record.contains(keyword) && best.map(|(_, w)| weight > w).unwrap_or(true) {
                    best = Some((keyword, weight));
                }
            }
        }

        Ok(best.map(|(keyword, weight)| {
            debug!(city, keyword, weight, "static monitor matched");
            RiskSignal {
                city: city.to_string(),
                multiplier: weight,
                reason: format!("{} reported in {city}", keyword.to_uppercase()),
                source: RiskSource::Static,
                themes: Vec::new(),
                article_url: None,
            }
        }))
    }
}

/// Priority composition: try `preferred`, fall back to `fallback` when the
/// preferred resolver fails or finds nothing.
///
/// With `strict` set, a preferred-resolver failure propagates instead of
/// falling back.
pub struct FallbackResolver<P, F> {
    preferred: P,
    fallback: F,
    strict: bool,
}

impl<P, F> FallbackResolver<P, F>
where
    P: RiskResolver,
    F: RiskResolver,
{
    pub fn new(preferred: P, fallback: F) -> Self {
        Self {
            preferred,
            fallback,
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl<P, F> RiskResolver for FallbackResolver<P, F>
where
    P: RiskResolver,
    F: RiskResolver,
{
    fn resolve_risk(&self, city: &str) -> Result<Option<RiskSignal>, RiskError> {
        match self.preferred.resolve_risk(city) {
            Ok(Some(signal)) => Ok(Some(signal)),
            Ok(None) => self.fallback.resolve_risk(city),
            Err(err) if self.strict => Err(err),
            Err(err) => {
                warn!(city, error = %err, "preferred resolver failed, falling back");
                self.fallback.resolve_risk(city)
            }
        }
    }
}

/// A resolver that never finds risk; stands in for the live path when it is
/// disabled.
pub struct NoRisk;

impl RiskResolver for NoRisk {
    fn resolve_risk(&self, _city: &str) -> Result<Option<RiskSignal>, RiskError> {
        Ok(None)
    }
}
