//! Cache hit/miss classification
//!
//! Rules run in a fixed order: browser disk cache, then `304`, then the
//! provider's own cache headers, then `Age`, then `Cache-Control` as an
//! informational fallback.

use serde::{Deserialize, Serialize};

use super::provider::CdnProvider;
use crate::headers::{contains_ignore_case, HeaderLookup};
use crate::models::HttpExchange;

pub const UNKNOWN_STATUS: &str = "Unknown";
pub const DISK_CACHE_STATUS: &str = "Browser Disk Cache";
pub const NOT_MODIFIED_STATUS: &str = "304 Not Modified (Browser Cache)";

/// `cf-cache-status` values that mean the edge answered from cache
const CLOUDFLARE_HIT_STATUSES: &[&str] = &["HIT", "STALE", "UPDATING", "REVALIDATED"];

/// `red-cache` values that mean the request went to origin
const REDBOX_ORIGIN_STATUSES: &[&str] = &["miss", "pass", "-"];

/// Where a response came from, as far as the headers tell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub status: String,
    #[serde(rename = "isFromCDN")]
    pub is_from_cdn: bool,
    pub is_from_disk_cache: bool,
    pub is_from_origin: bool,
}

impl Default for CacheStatus {
    fn default() -> Self {
        Self {
            status: UNKNOWN_STATUS.to_string(),
            is_from_cdn: false,
            is_from_disk_cache: false,
            is_from_origin: true,
        }
    }
}

impl CacheStatus {
    fn browser_cache(status: &str) -> Self {
        Self {
            status: status.to_string(),
            is_from_cdn: false,
            is_from_disk_cache: true,
            is_from_origin: false,
        }
    }

    /// Record a provider verdict; origin is the complement of a hit
    fn set_verdict(&mut self, status: &str, hit: bool) {
        self.status = status.to_string();
        self.is_from_cdn = hit;
        self.is_from_origin = !hit;
    }

    /// Generic rule: the header value mentions "hit"
    fn set_from_hit_header(&mut self, value: &str) {
        self.set_verdict(value, contains_ignore_case(value, "hit"));
    }
}

/// Classify the cache state of an exchange served by `provider`
pub fn detect_cache_status(exchange: &HttpExchange, provider: CdnProvider) -> CacheStatus {
    let lookup = HeaderLookup::new(exchange.headers());
    status_with_lookup(exchange, provider, &lookup)
}

pub(crate) fn status_with_lookup(
    exchange: &HttpExchange,
    provider: CdnProvider,
    lookup: &HeaderLookup<'_>,
) -> CacheStatus {
    if exchange.cache_hints.indicates_disk_cache() {
        return CacheStatus::browser_cache(DISK_CACHE_STATUS);
    }
    if exchange.response_status == Some(304) {
        return CacheStatus::browser_cache(NOT_MODIFIED_STATUS);
    }

    let mut result = CacheStatus::default();
    apply_provider_rules(&mut result, provider, lookup);

    if let Some(age) = lookup.get("age").and_then(parse_leading_int) {
        if age > 0 && !result.is_from_cdn && !result.is_from_disk_cache {
            result.is_from_cdn = true;
            result.is_from_origin = false;
            if result.status == UNKNOWN_STATUS {
                result.status = format!("Cached (Age: {age}s)");
            }
        }
    }

    if result.status == UNKNOWN_STATUS {
        if let Some(cache_control) = lookup.get("cache-control") {
            result.status = format!("Cache-Control: {cache_control}");
        }
    }

    result
}

fn apply_provider_rules(result: &mut CacheStatus, provider: CdnProvider, h: &HeaderLookup<'_>) {
    match provider {
        CdnProvider::Cloudflare => {
            if let Some(value) = h.get("cf-cache-status") {
                let hit = CLOUDFLARE_HIT_STATUSES
                    .iter()
                    .any(|status| value.eq_ignore_ascii_case(status));
                result.set_verdict(value, hit);
            }
        }
        CdnProvider::Fastly => {
            if let (true, Some(x_cache)) = (h.contains("x-served-by"), h.get("x-cache")) {
                result.set_from_hit_header(x_cache);
            }
        }
        CdnProvider::Varnish => {
            if let Some(x_cache) = h.get("x-cache") {
                result.set_from_hit_header(x_cache);
            } else if let Some(x_varnish) = h.get("x-varnish") {
                // a second transaction id means the object came from cache
                let hit = x_varnish.split(' ').count() > 1;
                result.set_verdict(if hit { "HIT" } else { "MISS" }, hit);
            }
        }
        CdnProvider::MaxCdn => {
            if let Some(x_cache) = h.get("x-cache") {
                result.set_from_hit_header(x_cache);
            } else if let Some(x_hw) = h.get("x-hw") {
                let x_hw = x_hw.to_ascii_lowercase();
                let hit = x_hw.contains(".c") || x_hw.contains(".hn");
                let miss = x_hw.contains(".p");
                result.status = match (hit, miss) {
                    (true, _) => "HIT",
                    (false, true) => "MISS",
                    (false, false) => UNKNOWN_STATUS,
                }
                .to_string();
                result.is_from_cdn = hit;
                result.is_from_origin = miss;
            }
        }
        CdnProvider::GoogleCloudCdn => {
            if let Some(x_cache) = h.get("x-cache") {
                result.set_from_hit_header(x_cache);
            } else if h.get("via").is_some_and(|via| contains_ignore_case(via, "google")) {
                result.status = "Served via Google CDN".to_string();
            }
        }
        CdnProvider::Incapsula => {
            match (h.contains("x-iinfo"), h.get("incap-cache-status")) {
                (true, Some(value)) => result.set_verdict(value, value.eq_ignore_ascii_case("hit")),
                (true, None) => result.status = "Served by Incapsula".to_string(),
                _ => {}
            }
        }
        CdnProvider::Redbox => {
            if let Some(value) = h.get("red-cache") {
                result.status = value.to_string();
                result.is_from_cdn = value.eq_ignore_ascii_case("hit");
                result.is_from_origin = REDBOX_ORIGIN_STATUSES
                    .iter()
                    .any(|status| value.eq_ignore_ascii_case(status));
            }
        }
        // Akamai, CloudFront, KeyCDN, Azure and anything unlisted share the
        // generic x-cache vocabulary ("TCP_HIT" contains "hit" already)
        _ => {
            if let Some(x_cache) = h.get("x-cache") {
                result.set_from_hit_header(x_cache);
            }
        }
    }
}

/// Leading integer of a header value, ignoring anything after the digits
fn parse_leading_int(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let (sign, digits) = match value.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, value.strip_prefix('+').unwrap_or(value)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CacheHints;

    fn exchange(status: u16, headers: &[(&str, &str)]) -> HttpExchange {
        HttpExchange::new("GET", "https://example.com/").with_response(
            status,
            headers.iter().map(|(n, v)| (n.to_string(), v.to_string())),
        )
    }

    #[test]
    fn disk_cache_short_circuits_provider_rules() {
        let mut ex = exchange(200, &[("cf-cache-status", "HIT")]);
        ex.cache_hints = CacheHints {
            browser_cache_flag: Some(true),
            ..Default::default()
        };
        let status = detect_cache_status(&ex, CdnProvider::Cloudflare);
        assert_eq!(status.status, DISK_CACHE_STATUS);
        assert!(status.is_from_disk_cache);
        assert!(!status.is_from_cdn);
        assert!(!status.is_from_origin);
    }

    #[test]
    fn not_modified_is_browser_cache() {
        let status = detect_cache_status(&exchange(304, &[("x-cache", "HIT")]), CdnProvider::Fastly);
        assert_eq!(status.status, NOT_MODIFIED_STATUS);
        assert!(status.is_from_disk_cache);
        assert!(!status.is_from_origin);
    }

    #[test]
    fn cloudflare_hit_vocabulary() {
        for (value, hit) in [
            ("HIT", true),
            ("stale", true),
            ("UPDATING", true),
            ("REVALIDATED", true),
            ("MISS", false),
            ("DYNAMIC", false),
            ("BYPASS", false),
        ] {
            let status =
                detect_cache_status(&exchange(200, &[("cf-cache-status", value)]), CdnProvider::Cloudflare);
            assert_eq!(status.status, value);
            assert_eq!(status.is_from_cdn, hit, "{value}");
            assert_eq!(status.is_from_origin, !hit, "{value}");
        }
    }

    #[test]
    fn fastly_needs_served_by_and_x_cache() {
        let only_cache = detect_cache_status(&exchange(200, &[("x-cache", "HIT")]), CdnProvider::Fastly);
        assert_eq!(only_cache.status, UNKNOWN_STATUS);
        assert!(only_cache.is_from_origin);

        let both = detect_cache_status(
            &exchange(200, &[("x-served-by", "cache-nrt1220-NRT"), ("x-cache", "MISS, HIT")]),
            CdnProvider::Fastly,
        );
        assert_eq!(both.status, "MISS, HIT");
        assert!(both.is_from_cdn);
    }

    #[test]
    fn akamai_and_cloudfront_use_x_cache() {
        let akamai = detect_cache_status(
            &exchange(200, &[("x-cache", "TCP_HIT from a1.akamaiedge.net")]),
            CdnProvider::Akamai,
        );
        assert!(akamai.is_from_cdn);

        let cloudfront = detect_cache_status(
            &exchange(200, &[("x-cache", "Miss from cloudfront")]),
            CdnProvider::CloudFront,
        );
        assert_eq!(cloudfront.status, "Miss from cloudfront");
        assert!(!cloudfront.is_from_cdn);
        assert!(cloudfront.is_from_origin);
    }

    #[test]
    fn varnish_transaction_ids() {
        let hit = detect_cache_status(&exchange(200, &[("x-varnish", "123 456")]), CdnProvider::Varnish);
        assert_eq!(hit.status, "HIT");
        assert!(hit.is_from_cdn);

        let miss = detect_cache_status(&exchange(200, &[("x-varnish", "123")]), CdnProvider::Varnish);
        assert_eq!(miss.status, "MISS");
        assert!(miss.is_from_origin);
    }

    #[test]
    fn stackpath_x_hw_suffixes() {
        let cases = [
            ("1.c", "HIT", true, false),
            ("abc.hn", "HIT", true, false),
            ("abc.p", "MISS", false, true),
            ("abc", UNKNOWN_STATUS, false, false),
        ];
        for (x_hw, expected, cdn, origin) in cases {
            let status = detect_cache_status(&exchange(200, &[("x-hw", x_hw)]), CdnProvider::MaxCdn);
            assert_eq!(status.status, expected, "{x_hw}");
            assert_eq!(status.is_from_cdn, cdn, "{x_hw}");
            assert_eq!(status.is_from_origin, origin, "{x_hw}");
        }
    }

    #[test]
    fn incapsula_without_cache_status_header() {
        let status = detect_cache_status(&exchange(200, &[("x-iinfo", "1-2-3")]), CdnProvider::Incapsula);
        assert_eq!(status.status, "Served by Incapsula");
        assert!(!status.is_from_cdn);

        let hit = detect_cache_status(
            &exchange(200, &[("x-iinfo", "1-2-3"), ("incap-cache-status", "HIT")]),
            CdnProvider::Incapsula,
        );
        assert!(hit.is_from_cdn);
        assert!(!hit.is_from_origin);
    }

    #[test]
    fn redbox_origin_values() {
        for (value, cdn, origin) in [("HIT", true, false), ("MISS", false, true), ("-", false, true), ("other", false, false)] {
            let status = detect_cache_status(&exchange(200, &[("red-cache", value)]), CdnProvider::Redbox);
            assert_eq!(status.is_from_cdn, cdn, "{value}");
            assert_eq!(status.is_from_origin, origin, "{value}");
        }
    }

    #[test]
    fn google_via_only() {
        for via in ["1.1 google", "1.1 Google"] {
            let status = detect_cache_status(&exchange(200, &[("via", via)]), CdnProvider::GoogleCloudCdn);
            assert_eq!(status.status, "Served via Google CDN", "{via}");
            assert!(status.is_from_origin, "{via}");
        }
    }

    #[test]
    fn positive_age_implies_cdn_hit() {
        let status = detect_cache_status(&exchange(200, &[("age", "120")]), CdnProvider::None);
        assert_eq!(status.status, "Cached (Age: 120s)");
        assert!(status.is_from_cdn);
        assert!(!status.is_from_origin);

        // an explicit miss keeps its label but age still wins the flags
        let status = detect_cache_status(
            &exchange(200, &[("x-cache", "MISS"), ("age", "5")]),
            CdnProvider::CloudFront,
        );
        assert_eq!(status.status, "MISS");
        assert!(status.is_from_cdn);

        let zero = detect_cache_status(&exchange(200, &[("age", "0")]), CdnProvider::None);
        assert!(zero.is_from_origin);
    }

    #[test]
    fn cache_control_is_the_last_resort_label() {
        let status = detect_cache_status(
            &exchange(200, &[("Cache-Control", "max-age=60")]),
            CdnProvider::None,
        );
        assert_eq!(status.status, "Cache-Control: max-age=60");
        assert!(status.is_from_origin);
    }

    #[test]
    fn leading_int_parsing() {
        assert_eq!(parse_leading_int("42"), Some(42));
        assert_eq!(parse_leading_int(" 7s"), Some(7));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("abc"), None);
    }
}
