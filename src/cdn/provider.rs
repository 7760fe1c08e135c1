//! CDN provider detection
//!
//! Providers are identified from response headers through an ordered
//! predicate table, then from the `Via` header, then from the request host.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::har::url;
use crate::headers::{contains_ignore_case, HeaderLookup};
use crate::models::HttpExchange;

/// CDN providers the classifier knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CdnProvider {
    Cloudflare,
    Akamai,
    Fastly,
    CloudFront,
    Varnish,
    #[serde(rename = "KeyCDN")]
    KeyCdn,
    #[serde(rename = "MaxCDN/StackPath")]
    MaxCdn,
    Limelight,
    Incapsula,
    #[serde(rename = "REDBOX")]
    Redbox,
    #[serde(rename = "Azure CDN")]
    AzureCdn,
    #[serde(rename = "Google Cloud CDN")]
    GoogleCloudCdn,
    #[serde(rename = "CDN77")]
    Cdn77,
    #[serde(rename = "CDNvideo")]
    CdnVideo,
    CacheFly,
    #[default]
    None,
}

impl CdnProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CdnProvider::Cloudflare => "Cloudflare",
            CdnProvider::Akamai => "Akamai",
            CdnProvider::Fastly => "Fastly",
            CdnProvider::CloudFront => "CloudFront",
            CdnProvider::Varnish => "Varnish",
            CdnProvider::KeyCdn => "KeyCDN",
            CdnProvider::MaxCdn => "MaxCDN/StackPath",
            CdnProvider::Limelight => "Limelight",
            CdnProvider::Incapsula => "Incapsula",
            CdnProvider::Redbox => "REDBOX",
            CdnProvider::AzureCdn => "Azure CDN",
            CdnProvider::GoogleCloudCdn => "Google Cloud CDN",
            CdnProvider::Cdn77 => "CDN77",
            CdnProvider::CdnVideo => "CDNvideo",
            CdnProvider::CacheFly => "CacheFly",
            CdnProvider::None => "None",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, CdnProvider::None)
    }
}

impl fmt::Display for CdnProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header evidence for one provider. `server` is the lowercased `Server` value.
type ProviderPredicate = fn(&HeaderLookup<'_>, &str) -> bool;

/// Evaluated in order; Cloudflare first since its headers are the most specific.
const PROVIDER_PREDICATES: &[(CdnProvider, ProviderPredicate)] = &[
    (CdnProvider::Cloudflare, |h, server| {
        h.contains("cf-ray") || h.contains("cf-cache-status") || server.contains("cloudflare")
    }),
    (CdnProvider::Akamai, |h, server| {
        h.contains("x-akamai-transformed")
            || h.contains("x-cache-key")
            || h.any_value_contains("x-cache", "akamai")
            || h.any_value_contains("x-cache", "tcp_hit")
            || server.contains("akamai")
    }),
    (CdnProvider::Fastly, |h, server| {
        h.contains("x-fastly-request-id")
            || server.contains("fastly")
            || h.any_value_contains("x-tw-cdn", "ft")
    }),
    (CdnProvider::CloudFront, |h, _| {
        h.contains("x-amz-cf-id") || h.contains("x-amz-cf-pop")
    }),
    (CdnProvider::Varnish, |h, server| {
        h.contains("x-varnish") || server.contains("varnish")
    }),
    (CdnProvider::KeyCdn, |h, server| {
        h.any_value_contains("x-cdn", "keycdn") || server.contains("keycdn")
    }),
    (CdnProvider::MaxCdn, |h, server| {
        h.contains("x-cdn-pullzone") || server.contains("netdna")
    }),
    (CdnProvider::Limelight, |h, server| {
        server.contains("llnwd") || h.contains("x-llnw-request-id")
    }),
    (CdnProvider::Incapsula, |h, _| {
        h.contains("x-iinfo") || h.any_value_contains("x-cdn", "incapsula")
    }),
    (CdnProvider::Redbox, |h, _| {
        h.any_value_contains("x-powered-by", "redbox")
    }),
    (CdnProvider::AzureCdn, |h, _| {
        h.contains("x-msedge-ref") || h.any_value_contains("x-cache", "az")
    }),
    (CdnProvider::GoogleCloudCdn, |h, server| {
        h.any_value_contains("via", "google")
            || h.any_value_contains("via", "gse")
            || server.contains("google")
    }),
];

/// Substrings of the `Via` header, checked when no header predicate matched
const VIA_MARKERS: &[(&str, CdnProvider)] = &[
    ("cloudflare", CdnProvider::Cloudflare),
    ("akamai", CdnProvider::Akamai),
    ("fastly", CdnProvider::Fastly),
    ("cloudfront", CdnProvider::CloudFront),
    ("incapsula", CdnProvider::Incapsula),
    ("redbox", CdnProvider::Redbox),
    ("cdn77", CdnProvider::Cdn77),
];

/// Host name substrings of CDN-operated domains
const HOST_MARKERS: &[(&str, CdnProvider)] = &[
    ("akamaiedge", CdnProvider::Akamai),
    ("akamai.net", CdnProvider::Akamai),
    ("cloudflare", CdnProvider::Cloudflare),
    ("fastly", CdnProvider::Fastly),
    ("cloudfront.net", CdnProvider::CloudFront),
    ("azureedge.net", CdnProvider::AzureCdn),
    ("googleusercontent", CdnProvider::GoogleCloudCdn),
    ("gstatic", CdnProvider::GoogleCloudCdn),
    ("cdn77.org", CdnProvider::Cdn77),
    ("cdnvideo.ru", CdnProvider::CdnVideo),
    ("cachefly.net", CdnProvider::CacheFly),
];

/// Detect the CDN that served an exchange
pub fn detect_provider(exchange: &HttpExchange) -> CdnProvider {
    let Some(headers) = exchange.response_headers.as_deref() else {
        return CdnProvider::None;
    };
    let lookup = HeaderLookup::new(headers);
    detect_with_lookup(exchange, &lookup)
}

pub(crate) fn detect_with_lookup(exchange: &HttpExchange, lookup: &HeaderLookup<'_>) -> CdnProvider {
    if !lookup.is_empty() {
        let server = lookup.get_or_empty("server").to_ascii_lowercase();
        if let Some((provider, _)) = PROVIDER_PREDICATES
            .iter()
            .find(|(_, predicate)| predicate(lookup, &server))
        {
            return *provider;
        }
    }

    if let Some(via) = lookup.get("via") {
        if let Some((_, provider)) = VIA_MARKERS
            .iter()
            .find(|(marker, _)| contains_ignore_case(via, marker))
        {
            return *provider;
        }
    }

    url::hostname(&exchange.request_url)
        .and_then(|host| {
            HOST_MARKERS
                .iter()
                .find(|(marker, _)| host.contains(marker))
                .map(|(_, provider)| *provider)
        })
        .unwrap_or(CdnProvider::None)
}
