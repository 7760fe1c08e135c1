//! Provider-specific diagnostic fields pulled from response headers

use serde::{Serialize, Serializer};

use super::provider::CdnProvider;
use crate::headers::HeaderLookup;
use crate::models::HttpExchange;

/// Header name fragments that mark a header as CDN-related
pub const CDN_HEADER_MARKERS: &[&str] = &[
    "cf-", "x-cache", "x-cdn", "x-edge", "x-amz-cf", "x-served", "x-varnish", "x-fastly",
    "x-msedge", "via", "x-akamai", "red-",
];

/// Diagnostics a CDN exposes about how it handled a request.
///
/// Only the fields the provider actually sent are populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdnDetails {
    /// Cloudflare `cf-ray`, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ray_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth_saving: Option<String>,
    /// Fastly `x-served-by`, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_remote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub varnish_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hit_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    /// `Age` header, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age: Option<String>,
    /// Every CDN-related header, lowercased name to first value, in capture order
    #[serde(serialize_with = "serialize_in_order")]
    pub all_cdn_headers: Vec<(String, String)>,
}

/// Write name/value pairs as a JSON object, keeping capture order
fn serialize_in_order<S: Serializer>(pairs: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(pairs.iter().map(|(name, value)| (name, value)))
}

impl CdnDetails {
    pub fn cdn_header(&self, name: &str) -> Option<&str> {
        self.all_cdn_headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// True when nothing provider-specific was found
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Extract diagnostics for an exchange served by `provider`
pub fn extract_cdn_details(exchange: &HttpExchange, provider: CdnProvider) -> CdnDetails {
    let lookup = HeaderLookup::new(exchange.headers());
    details_with_lookup(provider, &lookup)
}

pub(crate) fn details_with_lookup(provider: CdnProvider, h: &HeaderLookup<'_>) -> CdnDetails {
    let owned = |name: &str| h.get(name).map(str::to_string);
    let mut details = CdnDetails::default();

    match provider {
        CdnProvider::Cloudflare => {
            if let Some(ray) = h.get("cf-ray") {
                details.ray_id = Some(ray.to_string());
                let parts: Vec<&str> = ray.split('-').collect();
                if parts.len() > 1 {
                    details.datacenter = Some(parts[1].to_string());
                    details.edge_location = Some(parts[1].to_string());
                    details.request_id = Some(parts[0].to_string());
                }
            }
            details.cache_status = owned("cf-cache-status");
            if h.contains("cf-bgj") {
                details.bandwidth_saving = Some("Enabled".to_string());
            }
        }
        CdnProvider::CloudFront => {
            details.edge_location = owned("x-amz-cf-pop");
            details.request_id = owned("x-amz-cf-id");
            details.cache_status = owned("x-cache");
        }
        CdnProvider::Fastly => {
            if let Some(served_by) = h.get("x-served-by") {
                details.served_by = Some(served_by.to_string());
                details.edge_location = Some(fastly_pops(served_by));
            }
            details.cache_status = owned("x-cache");
            details.request_id = owned("x-fastly-request-id").or_else(|| owned("x-request-id"));
        }
        CdnProvider::Akamai => {
            details.cache_status = owned("x-cache");
            details.cache_key = owned("x-cache-key");
            details.cache_remote = owned("x-cache-remote");
            details.request_id = owned("x-akamai-request-id").or_else(|| owned("x-request-id"));
        }
        CdnProvider::Varnish => {
            if let Some(x_varnish) = h.get("x-varnish") {
                details.varnish_id = Some(x_varnish.to_string());
                let mut ids = x_varnish.split(' ');
                if let (Some(hit), Some(lookup)) = (ids.next(), ids.next()) {
                    details.cache_hit_id = Some(hit.to_string());
                    details.lookup_id = Some(lookup.to_string());
                }
            }
            details.cache_status = owned("x-cache");
        }
        CdnProvider::AzureCdn => {
            details.edge_reference = owned("x-msedge-ref");
            details.edge_location = owned("x-msedge-ref");
            details.cache_status = owned("x-cache");
        }
        CdnProvider::GoogleCloudCdn => {
            details.via = owned("via");
            details.cache_status = owned("x-cache");
        }
        CdnProvider::Redbox => {
            details.cache_status = owned("red-cache");
            details.request_id = owned("via");
        }
        _ => {}
    }

    details.cache_age = owned("age");
    details.all_cdn_headers = h
        .iter()
        .filter(|(name, _)| CDN_HEADER_MARKERS.iter().any(|marker| name.contains(marker)))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    details
}

/// `cache-dfw18633-DFW, cache-nrt1220-NRT` -> `dfw18633-DFW,nrt1220-NRT`
fn fastly_pops(served_by: &str) -> String {
    served_by
        .split(", ")
        .map(|node| {
            let parts: Vec<&str> = node.split('-').collect();
            parts[parts.len().saturating_sub(2)..].join("-")
        })
        .collect::<Vec<_>>()
        .join(",")
}
