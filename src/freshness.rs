//! Cache freshness
//!
//! Computes two independent verdicts for a response: how long the browser may
//! reuse it, and what the CDN in front of the origin made of it. The current
//! time is always passed in, so results are reproducible.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::headers::{contains_ignore_case, HeaderLookup};
use crate::models::HttpExchange;

static MAX_AGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)max-age=(\d+)").expect("valid max-age pattern"));
static S_MAXAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)s-maxage=(\d+)").expect("valid s-maxage pattern"));

/// Used as the response time when neither `Date` nor a start time is known
const FALLBACK_RESPONSE_AGE_SECS: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FreshnessStatus {
    Fresh,
    Stale,
    #[serde(rename = "Not Cacheable")]
    NotCacheable,
    #[default]
    Unknown,
}

impl FreshnessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FreshnessStatus::Fresh => "Fresh",
            FreshnessStatus::Stale => "Stale",
            FreshnessStatus::NotCacheable => "Not Cacheable",
            FreshnessStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FreshnessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CDN family inferred from cache headers alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CdnLaneProvider {
    Cloudflare,
    CloudFront,
    #[serde(rename = "Fastly/Other")]
    FastlyOrOther,
}

impl fmt::Display for CdnLaneProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CdnLaneProvider::Cloudflare => "Cloudflare",
            CdnLaneProvider::CloudFront => "CloudFront",
            CdnLaneProvider::FastlyOrOther => "Fastly/Other",
        })
    }
}

/// `cf-cache-status` to CDN freshness. MISS and EXPIRED still ended in a
/// successful origin fetch, so the client got a fresh copy.
const CLOUDFLARE_FRESHNESS: &[(&str, FreshnessStatus)] = &[
    ("HIT", FreshnessStatus::Fresh),
    ("MISS", FreshnessStatus::Fresh),
    ("EXPIRED", FreshnessStatus::Fresh),
    ("REVALIDATED", FreshnessStatus::Fresh),
    ("UPDATING", FreshnessStatus::Fresh),
    ("STALE", FreshnessStatus::Stale),
    ("BYPASS", FreshnessStatus::NotCacheable),
    ("DYNAMIC", FreshnessStatus::NotCacheable),
    ("NONE", FreshnessStatus::NotCacheable),
    ("UNKNOWN", FreshnessStatus::NotCacheable),
];

/// CloudFront `x-cache` outcomes, checked in order
const CLOUDFRONT_FRESHNESS: &[(&str, FreshnessStatus)] = &[
    ("Miss from cloudfront", FreshnessStatus::Fresh),
    ("Hit from cloudfront", FreshnessStatus::Fresh),
    ("RefreshHit from cloudfront", FreshnessStatus::Fresh),
    ("Error from cloudfront", FreshnessStatus::Unknown),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserFreshness {
    pub status: FreshnessStatus,
    pub expiry_time: Option<DateTime<Utc>>,
    /// Whole seconds until expiry, negative once stale
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdnFreshness {
    pub status: FreshnessStatus,
    pub provider: Option<CdnLaneProvider>,
    pub expiry_time: Option<DateTime<Utc>>,
    pub ttl_seconds: Option<i64>,
    /// `X-Cache` as received, empty when absent
    pub raw_x_cache: String,
    /// `CF-Cache-Status` as received, empty when absent
    pub raw_cf_cache_status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FreshnessResult {
    pub browser: BrowserFreshness,
    pub cdn: CdnFreshness,
}

/// Freshness relative to the system clock
pub fn calculate_freshness(exchange: &HttpExchange) -> FreshnessResult {
    calculate_freshness_at(exchange, Utc::now())
}

/// Freshness relative to `now`
pub fn calculate_freshness_at(exchange: &HttpExchange, now: DateTime<Utc>) -> FreshnessResult {
    let lookup = HeaderLookup::new(exchange.headers());
    let cache_control = lookup.get_or_empty("cache-control");
    let x_cache = lookup.get_or_empty("x-cache");
    let cf_cache_status = lookup.get_or_empty("cf-cache-status");

    let response_time = response_time(&lookup, exchange, now);
    let max_age = directive_seconds(&MAX_AGE, cache_control);
    let s_maxage = directive_seconds(&S_MAXAGE, cache_control);
    // An unparsable Expires (commonly "0" or "-1") is dropped, so a response
    // with nothing else to go on stays Unknown instead of turning Stale.
    let expires = lookup.get("expires").filter(|v| !v.is_empty()).and_then(|value| {
        let parsed = parse_http_date(value);
        if parsed.is_none() {
            tracing::warn!(value, url = %exchange.request_url, "ignoring unparsable Expires header");
        }
        parsed
    });

    // browser lane
    let mut browser = BrowserFreshness::default();
    if contains_ignore_case(cache_control, "no-store") || contains_ignore_case(cache_control, "no-cache") {
        browser.status = FreshnessStatus::NotCacheable;
    } else if let Some(expiry) = max_age.and_then(|secs| add_seconds(response_time, secs)) {
        browser.expiry_time = Some(expiry);
    } else if let Some(expiry) = expires {
        browser.expiry_time = Some(expiry);
    }
    if let Some(expiry) = browser.expiry_time {
        browser.status = status_at(expiry, now);
        browser.ttl_seconds = Some(ttl_seconds(expiry, now));
    }

    // CDN lane
    let mut cdn = CdnFreshness {
        provider: infer_cdn_provider(x_cache, cf_cache_status),
        raw_x_cache: x_cache.to_string(),
        raw_cf_cache_status: cf_cache_status.to_string(),
        ..Default::default()
    };
    match cdn.provider {
        Some(CdnLaneProvider::Cloudflare) => {
            cdn.status = lookup_status(CLOUDFLARE_FRESHNESS, |key| cf_cache_status.eq_ignore_ascii_case(key));
        }
        Some(CdnLaneProvider::CloudFront) => {
            cdn.status = lookup_status(CLOUDFRONT_FRESHNESS, |key| x_cache.contains(key));
        }
        Some(CdnLaneProvider::FastlyOrOther) => {
            if x_cache.contains("Hit") || x_cache.contains("Miss") {
                cdn.status = FreshnessStatus::Fresh;
            }
        }
        None => {
            if contains_ignore_case(cache_control, "no-store") {
                cdn.status = FreshnessStatus::NotCacheable;
            } else if let Some(expiry) = s_maxage
                .or(max_age)
                .and_then(|secs| add_seconds(response_time, secs))
                .or(expires)
            {
                cdn.expiry_time = Some(expiry);
                cdn.status = status_at(expiry, now);
                cdn.ttl_seconds = Some(ttl_seconds(expiry, now));
            }
        }
    }

    FreshnessResult { browser, cdn }
}

fn infer_cdn_provider(x_cache: &str, cf_cache_status: &str) -> Option<CdnLaneProvider> {
    if !cf_cache_status.is_empty() {
        Some(CdnLaneProvider::Cloudflare)
    } else if x_cache.contains("cloudfront") {
        Some(CdnLaneProvider::CloudFront)
    } else if !x_cache.is_empty() {
        Some(CdnLaneProvider::FastlyOrOther)
    } else {
        None
    }
}

fn lookup_status(table: &[(&str, FreshnessStatus)], matches: impl Fn(&str) -> bool) -> FreshnessStatus {
    table
        .iter()
        .find(|(key, _)| matches(key))
        .map(|(_, status)| *status)
        .unwrap_or_default()
}

/// `Date` header, then the request start, then a fixed offset before `now`
fn response_time(lookup: &HeaderLookup<'_>, exchange: &HttpExchange, now: DateTime<Utc>) -> DateTime<Utc> {
    if let Some(value) = lookup.get("date").filter(|v| !v.is_empty()) {
        match parse_http_date(value) {
            Some(date) => return date,
            None => tracing::warn!(value, url = %exchange.request_url, "ignoring unparsable Date header"),
        }
    }
    exchange
        .started_at
        .unwrap_or_else(|| now - Duration::seconds(FALLBACK_RESPONSE_AGE_SECS))
}

fn directive_seconds(pattern: &Regex, cache_control: &str) -> Option<i64> {
    pattern
        .captures(cache_control)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok())
}

fn add_seconds(base: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(secs).and_then(|delta| base.checked_add_signed(delta))
}

fn status_at(expiry: DateTime<Utc>, now: DateTime<Utc>) -> FreshnessStatus {
    if now < expiry {
        FreshnessStatus::Fresh
    } else {
        FreshnessStatus::Stale
    }
}

/// Floor of the remaining time in seconds
fn ttl_seconds(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expiry - now).num_milliseconds().div_euclid(1000)
}

/// Parse an HTTP date: IMF-fixdate / RFC 2822, RFC 3339, RFC 850 or asctime
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.with_timezone(&Utc));
    }
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        parse_http_date("2025-03-11T12:00:00Z").expect("fixed clock")
    }

    fn exchange(started: &str, headers: &[(&str, &str)]) -> HttpExchange {
        let mut ex = HttpExchange::new("GET", "https://example.com/").with_response(
            200,
            headers.iter().map(|(n, v)| (n.to_string(), v.to_string())),
        );
        ex.started_at = parse_http_date(started);
        ex
    }

    fn freshness(headers: &[(&str, &str)]) -> FreshnessResult {
        calculate_freshness_at(&exchange("2025-03-11T11:59:00Z", headers), now())
    }

    #[test]
    fn no_cache_headers_is_unknown() {
        let result = freshness(&[]);
        assert_eq!(result.browser.status, FreshnessStatus::Unknown);
        assert_eq!(result.cdn.status, FreshnessStatus::Unknown);
        assert_eq!(result.browser.ttl_seconds, None);
        assert_eq!(result.cdn.provider, None);
    }

    #[test]
    fn no_store_and_no_cache() {
        let result = freshness(&[("cache-control", "no-store")]);
        assert_eq!(result.browser.status, FreshnessStatus::NotCacheable);
        assert_eq!(result.cdn.status, FreshnessStatus::NotCacheable);

        let result = freshness(&[("Cache-Control", "No-Cache")]);
        assert_eq!(result.browser.status, FreshnessStatus::NotCacheable);
        assert_eq!(result.cdn.status, FreshnessStatus::Unknown);
    }

    #[test]
    fn max_age_fresh_with_ttl() {
        let result = freshness(&[
            ("date", "2025-03-11T11:59:00Z"),
            ("cache-control", "max-age=3600"),
        ]);
        assert_eq!(result.browser.status, FreshnessStatus::Fresh);
        assert_eq!(result.browser.ttl_seconds, Some(3540));
        assert_eq!(result.cdn.status, FreshnessStatus::Fresh);
        assert_eq!(result.cdn.ttl_seconds, Some(3540));
    }

    #[test]
    fn max_age_stale_has_negative_ttl() {
        let ex = exchange(
            "2025-03-11T10:30:00Z",
            &[("date", "Tue, 11 Mar 2025 10:30:00 GMT"), ("cache-control", "max-age=60")],
        );
        let result = calculate_freshness_at(&ex, now());
        assert_eq!(result.browser.status, FreshnessStatus::Stale);
        assert_eq!(result.cdn.status, FreshnessStatus::Stale);
        assert_eq!(result.browser.ttl_seconds, Some(-5340));
    }

    #[test]
    fn s_maxage_only_affects_cdn_lane() {
        let result = freshness(&[
            ("date", "2025-03-11T11:59:00Z"),
            ("cache-control", "max-age=60, s-maxage=3600"),
        ]);
        assert_eq!(result.browser.status, FreshnessStatus::Stale);
        assert_eq!(result.browser.ttl_seconds, Some(0));
        assert_eq!(result.cdn.status, FreshnessStatus::Fresh);
        assert_eq!(result.cdn.ttl_seconds, Some(3540));
    }

    #[test]
    fn expires_header() {
        let fresh = freshness(&[
            ("date", "2025-03-11T11:59:00Z"),
            ("expires", "2025-03-11T13:00:00Z"),
        ]);
        assert_eq!(fresh.browser.status, FreshnessStatus::Fresh);
        assert_eq!(fresh.browser.ttl_seconds, Some(3600));
        assert_eq!(fresh.cdn.status, FreshnessStatus::Fresh);

        let stale = freshness(&[
            ("date", "2025-03-11T11:59:00Z"),
            ("expires", "Tue, 11 Mar 2025 11:58:00 GMT"),
        ]);
        assert_eq!(stale.browser.status, FreshnessStatus::Stale);
        assert_eq!(stale.cdn.status, FreshnessStatus::Stale);

        for invalid in ["0", "-1"] {
            let garbage = freshness(&[("date", "2025-03-11T11:59:00Z"), ("expires", invalid)]);
            assert_eq!(garbage.browser.status, FreshnessStatus::Unknown, "{invalid}");
            assert_eq!(garbage.browser.expiry_time, None, "{invalid}");
            assert_eq!(garbage.cdn.status, FreshnessStatus::Unknown, "{invalid}");
            assert_eq!(garbage.cdn.expiry_time, None, "{invalid}");
        }
    }

    #[test]
    fn cloudflare_status_table() {
        let expected = [
            ("HIT", FreshnessStatus::Fresh),
            ("MISS", FreshnessStatus::Fresh),
            ("EXPIRED", FreshnessStatus::Fresh),
            ("UPDATING", FreshnessStatus::Fresh),
            ("REVALIDATED", FreshnessStatus::Fresh),
            ("STALE", FreshnessStatus::Stale),
            ("BYPASS", FreshnessStatus::NotCacheable),
            ("DYNAMIC", FreshnessStatus::NotCacheable),
            ("NONE", FreshnessStatus::NotCacheable),
            ("UNKNOWN", FreshnessStatus::NotCacheable),
            ("hit", FreshnessStatus::Fresh),
            ("DEFERRED", FreshnessStatus::Unknown),
        ];
        for (value, status) in expected {
            let result = freshness(&[("cf-cache-status", value), ("cache-control", "max-age=60")]);
            assert_eq!(result.cdn.status, status, "{value}");
            assert_eq!(result.cdn.provider, Some(CdnLaneProvider::Cloudflare));
            assert_eq!(result.cdn.raw_cf_cache_status, value);
            assert_eq!(result.cdn.expiry_time, None);
        }
    }

    #[test]
    fn cloudfront_and_other_providers() {
        for value in ["Hit from cloudfront", "Miss from cloudfront", "RefreshHit from cloudfront"] {
            let result = freshness(&[("x-cache", value)]);
            assert_eq!(result.cdn.provider, Some(CdnLaneProvider::CloudFront));
            assert_eq!(result.cdn.status, FreshnessStatus::Fresh, "{value}");
        }
        let error = freshness(&[("x-cache", "Error from cloudfront")]);
        assert_eq!(error.cdn.status, FreshnessStatus::Unknown);

        for value in ["Hit", "Miss"] {
            let result = freshness(&[("x-cache", value)]);
            assert_eq!(result.cdn.provider, Some(CdnLaneProvider::FastlyOrOther));
            assert_eq!(result.cdn.status, FreshnessStatus::Fresh);
            assert_eq!(result.cdn.raw_x_cache, value);
        }
    }

    #[test]
    fn response_time_falls_back_to_start_then_clock() {
        // unparsable Date uses the start time
        let ex = exchange("2025-03-11T11:59:00Z", &[("date", "yesterday"), ("cache-control", "max-age=120")]);
        let result = calculate_freshness_at(&ex, now());
        assert_eq!(result.browser.ttl_seconds, Some(60));

        let mut ex = exchange("", &[("cache-control", "max-age=120")]);
        ex.started_at = None;
        let result = calculate_freshness_at(&ex, now());
        assert_eq!(result.browser.ttl_seconds, Some(20));
        assert_eq!(result.browser.status, FreshnessStatus::Fresh);
    }

    #[test]
    fn missing_response_is_unknown() {
        let result = calculate_freshness_at(&HttpExchange::default(), now());
        assert_eq!(result, FreshnessResult::default());
    }

    #[test]
    fn parses_legacy_http_dates() {
        let expected = parse_http_date("1994-11-06T08:49:37Z");
        assert!(expected.is_some());
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), expected);
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), expected);
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), expected);
        assert_eq!(parse_http_date("not a date"), None);
    }

    #[test]
    fn status_serializes_with_display_names() {
        let json = serde_json::to_value(freshness(&[("x-cache", "Hit")])).unwrap();
        assert_eq!(json["cdn"]["provider"], "Fastly/Other");
        assert_eq!(json["browser"]["status"], "Unknown");
        assert_eq!(serde_json::to_value(FreshnessStatus::NotCacheable).unwrap(), "Not Cacheable");
    }
}
