//! Live feed client tests using a canned transport.

use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;

use routeguard::feed::{
    FeedConfig, FeedError, FeedTransport, LiveFeedClient, filter_disruptions,
    latest_snapshot_url, theme_multiplier,
};
use routeguard::risk::{RiskError, RiskResolver, RiskSource};

// ============================================================================
// Test Fixtures
// ============================================================================

fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// One snapshot row with the standard column offsets (date=1, source=4,
/// themes=8, locations=10).
fn snapshot_row(date: &str, source: &str, themes: &str, locations: &str) -> String {
    let mut fields = vec![""; 11];
    fields[1] = date;
    fields[4] = source;
    fields[8] = themes;
    fields[10] = locations;
    fields.join("\t")
}

fn manifest_for(url: &str) -> String {
    format!(
        "1001 aaaa http://feed.example/old.gkg.csv.gz\n\
         1002 bbbb {url}\n\
         malformed-trailing-line\n"
    )
}

struct CannedTransport {
    manifest: String,
    archive: Vec<u8>,
    text_calls: AtomicU32,
    bytes_calls: AtomicU32,
    /// Number of leading fetch_text calls that fail before succeeding.
    fail_first: AtomicU32,
}

impl CannedTransport {
    fn new(manifest: String, archive: Vec<u8>) -> Self {
        Self {
            manifest,
            archive,
            text_calls: AtomicU32::new(0),
            bytes_calls: AtomicU32::new(0),
            fail_first: AtomicU32::new(0),
        }
    }

    fn failing_first(self, failures: u32) -> Self {
        self.fail_first.store(failures, Ordering::SeqCst);
        self
    }
}

impl FeedTransport for &CannedTransport {
    fn fetch_text(&self, _url: &str) -> Result<String, FeedError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_first.load(Ordering::SeqCst) > 0 {
            self.fail_first.fetch_sub(1, Ordering::SeqCst);
            return Err(FeedError::NoSnapshotUrl);
        }
        Ok(self.manifest.clone())
    }

    fn fetch_bytes(&self, _url: &str) -> Result<Vec<u8>, FeedError> {
        self.bytes_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.archive.clone())
    }
}

fn config(ttl_secs: u64) -> FeedConfig {
    FeedConfig {
        manifest_url: "http://feed.example/manifest.txt".to_string(),
        timeout_secs: 1,
        max_attempts: 2,
        cache_ttl_secs: ttl_secs,
    }
}

fn sample_table() -> String {
    [
        snapshot_row(
            "20250825093000",
            "http://news.example/storm",
            "ENV_STORM;WEATHER",
            "1#Boston#US#42.36#-71.06",
        ),
        snapshot_row(
            "20250825093000",
            "http://news.example/port",
            "PORT;ECON_TRADE",
            "1#Boston Harbor#US#0#0;1#Miami#US#0#0",
        ),
        snapshot_row(
            "20250825093000",
            "http://news.example/sports",
            "SPORTS",
            "1#Boston#US#0#0",
        ),
    ]
    .join("\n")
}

// ============================================================================
// Manifest and snapshot parsing
// ============================================================================

#[test]
fn manifest_yields_last_well_formed_snapshot_url() {
    let manifest = manifest_for("http://feed.example/latest.gkg.csv.gz");
    assert_eq!(
        latest_snapshot_url(&manifest).as_deref(),
        Some("http://feed.example/latest.gkg.csv.gz")
    );
}

#[test]
fn manifest_without_marker_urls_is_rejected() {
    let manifest = "1001 aaaa http://feed.example/latest.other.csv.gz\nshort line\n";
    assert!(latest_snapshot_url(manifest).is_none());
}

#[test]
fn theme_multipliers_follow_severity_table() {
    assert_eq!(theme_multiplier("NATURAL_DISASTER;X"), 20.0);
    assert_eq!(theme_multiplier("ENV_FLOOD"), 20.0);
    assert_eq!(theme_multiplier("env_storm"), 20.0);
    assert_eq!(theme_multiplier("PORT;SHIPPING"), 10.0);
    assert_eq!(theme_multiplier("LOGISTICS"), 10.0);
    assert_eq!(theme_multiplier("STRIKE"), 5.0);
    assert_eq!(theme_multiplier("SOMETHING_ELSE"), 2.0);
}

#[test]
fn lookalike_themes_do_not_match_by_substring() {
    // "SPORTS" and "IMPORTS" embed "PORT" without a tag boundary; neither is
    // a shipping disruption.
    let table = [
        snapshot_row(
            "20250825093000",
            "http://news.example/game",
            "SPORTS;ENTERTAINMENT",
            "1#Boston#US#0#0",
        ),
        snapshot_row(
            "20250825093000",
            "http://news.example/trade",
            "IMPORTS;ECON_TRADE",
            "1#Boston#US#0#0",
        ),
    ]
    .join("\n");

    assert!(filter_disruptions(&table).is_empty());
    assert_eq!(theme_multiplier("SPORTS"), 2.0);
    assert_eq!(theme_multiplier("IMPORTS;ECON_TRADE"), 2.0);
}

#[test]
fn watch_themes_match_at_tag_boundaries() {
    assert_eq!(theme_multiplier("NATURAL_DISASTER_FLOOD"), 20.0);
    assert_eq!(theme_multiplier("MARITIME_PORT_CLOSURE"), 10.0);
    assert_eq!(theme_multiplier("GENERAL_STRIKE,120"), 5.0);
}

#[test]
fn filtering_keeps_only_watch_listed_records() {
    let records = filter_disruptions(&sample_table());
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].multiplier, 20.0);
    assert_eq!(records[0].locations, vec!["Boston"]);
    assert_eq!(records[1].multiplier, 10.0);
    assert_eq!(records[1].locations, vec!["Boston Harbor", "Miami"]);
}

#[test]
fn header_row_is_skipped() {
    let table = format!(
        "GKGRECORDID\tDATE\tA\tB\tDocumentIdentifier\tC\tD\tE\tV2Themes\tF\tV2Locations\n{}",
        sample_table()
    );
    assert_eq!(filter_disruptions(&table).len(), 2);
}

// ============================================================================
// Resolution, caching, retry
// ============================================================================

#[test]
fn city_risk_picks_highest_severity_match() {
    let transport = CannedTransport::new(
        manifest_for("http://feed.example/latest.gkg.csv.gz"),
        gzip(&sample_table()),
    );
    let client = LiveFeedClient::with_transport(config(900), &transport);

    let signal = client.resolve_risk("boston").unwrap().unwrap();
    assert_eq!(signal.source, RiskSource::Live);
    assert_eq!(signal.multiplier, 20.0);
    assert_eq!(signal.themes, vec!["ENV_STORM"]);
    assert_eq!(signal.article_url.as_deref(), Some("http://news.example/storm"));
}

#[test]
fn unmatched_city_is_no_risk() {
    let transport = CannedTransport::new(
        manifest_for("http://feed.example/latest.gkg.csv.gz"),
        gzip(&sample_table()),
    );
    let client = LiveFeedClient::with_transport(config(900), &transport);

    assert!(client.resolve_risk("Denver").unwrap().is_none());
}

#[test]
fn resolutions_within_ttl_share_one_fetch() {
    let transport = CannedTransport::new(
        manifest_for("http://feed.example/latest.gkg.csv.gz"),
        gzip(&sample_table()),
    );
    let client = LiveFeedClient::with_transport(config(900), &transport);

    client.resolve_risk("Boston").unwrap();
    client.resolve_risk("Miami").unwrap();

    assert_eq!(transport.text_calls.load(Ordering::SeqCst), 1);
    assert_eq!(transport.bytes_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn expired_cache_triggers_a_new_fetch() {
    let transport = CannedTransport::new(
        manifest_for("http://feed.example/latest.gkg.csv.gz"),
        gzip(&sample_table()),
    );
    let client = LiveFeedClient::with_transport(config(0), &transport);

    client.resolve_risk("Boston").unwrap();
    client.resolve_risk("Boston").unwrap();

    assert_eq!(transport.text_calls.load(Ordering::SeqCst), 2);
    assert_eq!(transport.bytes_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn transient_failure_is_retried_within_attempt_budget() {
    let transport = CannedTransport::new(
        manifest_for("http://feed.example/latest.gkg.csv.gz"),
        gzip(&sample_table()),
    )
    .failing_first(1);
    let client = LiveFeedClient::with_transport(config(900), &transport);

    let signal = client.resolve_risk("Boston").unwrap();
    assert!(signal.is_some());
    assert_eq!(transport.text_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn exhausted_retries_surface_the_last_error() {
    let transport = CannedTransport::new(
        manifest_for("http://feed.example/latest.gkg.csv.gz"),
        gzip(&sample_table()),
    )
    .failing_first(10);
    let client = LiveFeedClient::with_transport(config(900), &transport);

    let err = client.resolve_risk("Boston").unwrap_err();
    match err {
        RiskError::Feed(FeedError::Exhausted { attempts, .. }) => assert_eq!(attempts, 2),
        other => panic!("expected exhausted retries, got {other}"),
    }
}
