//! CDN and cache classification
//!
//! Works out which CDN (if any) served a response, whether the response came
//! from a CDN cache, the browser's disk cache or the origin, and collects the
//! provider's diagnostic headers.

pub mod cache_status;
pub mod details;
pub mod provider;

pub use cache_status::{detect_cache_status, CacheStatus};
pub use details::{extract_cdn_details, CdnDetails};
pub use provider::{detect_provider, CdnProvider};

use serde::Serialize;

use crate::headers::HeaderLookup;
use crate::models::HttpExchange;

/// Complete CDN verdict for one exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdnClassification {
    pub provider: CdnProvider,
    pub cache_status: String,
    #[serde(rename = "isFromCDN")]
    pub is_from_cdn: bool,
    pub is_from_disk_cache: bool,
    pub is_from_origin: bool,
    pub details: CdnDetails,
}

impl Default for CdnClassification {
    fn default() -> Self {
        Self {
            provider: CdnProvider::None,
            cache_status: cache_status::UNKNOWN_STATUS.to_string(),
            is_from_cdn: false,
            is_from_disk_cache: false,
            is_from_origin: true,
            details: CdnDetails::default(),
        }
    }
}

impl CdnClassification {
    /// Short label for where the response was served from
    pub fn source_label(&self) -> &'static str {
        if self.is_from_disk_cache {
            "disk-cache"
        } else if self.is_from_cdn {
            "cdn"
        } else if self.is_from_origin {
            "origin"
        } else {
            "unknown"
        }
    }
}

/// Classify an exchange: provider, cache state and provider details
pub fn analyze_cdn(exchange: &HttpExchange) -> CdnClassification {
    let lookup = HeaderLookup::new(exchange.headers());
    let provider = match exchange.response_headers {
        Some(_) => provider::detect_with_lookup(exchange, &lookup),
        None => CdnProvider::None,
    };

    let cache = cache_status::status_with_lookup(exchange, provider, &lookup);
    let mut result = CdnClassification {
        provider,
        ..Default::default()
    };

    if provider.is_none() {
        // without a CDN only the browser cache verdict is meaningful
        result.is_from_disk_cache = cache.is_from_disk_cache;
        result.is_from_origin = !cache.is_from_disk_cache;
        if cache.is_from_disk_cache {
            result.cache_status = cache.status;
        }
    } else {
        result.cache_status = cache.status;
        result.is_from_cdn = cache.is_from_cdn;
        result.is_from_disk_cache = cache.is_from_disk_cache;
        result.is_from_origin = cache.is_from_origin;
        result.details = details::details_with_lookup(provider, &lookup);
    }

    tracing::debug!(
        url = %exchange.request_url,
        provider = %result.provider,
        cache_status = %result.cache_status,
        "classified exchange"
    );
    result
}
