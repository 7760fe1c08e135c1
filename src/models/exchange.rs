//! HTTP exchange model
//!
//! The engine-facing view of one HAR entry: request line, response status and
//! headers, plus the browser cache hints some capture tools record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A name/value pair as it appears in HAR headers, cookies, query strings
/// and form parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

impl NameValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// HTTP headers are plain name/value pairs.
pub type Header = NameValue;

/// Signals that the capturing browser served the entry from its own cache.
///
/// These map onto Chrome-specific HAR properties; none of them are part of
/// the HAR 1.2 schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHints {
    /// `_fromDiskCache`
    pub browser_cache_flag: Option<bool>,
    /// `cache.beforeRequest` was populated
    pub cache_before_request: bool,
    /// `_resourceType`
    pub resource_type: Option<String>,
    /// Legacy `fromDiskCache`, only trusted alongside a resource type
    pub from_disk_cache: Option<bool>,
}

impl CacheHints {
    /// Whether any of the hints says the response came from the local disk cache.
    pub fn indicates_disk_cache(&self) -> bool {
        self.browser_cache_flag == Some(true)
            || self.cache_before_request
            || (self.resource_type.is_some() && self.from_disk_cache == Some(true))
    }
}

/// Represents a single captured request/response pair
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpExchange {
    /// Full request URL
    pub request_url: String,
    /// Request method as captured
    pub request_method: String,
    /// HTTP status code, absent when the response was missing or invalid
    pub response_status: Option<u16>,
    /// Response headers in capture order; `None` when there was no response
    pub response_headers: Option<Vec<Header>>,
    /// Browser cache hints recorded by the capture tool
    pub cache_hints: CacheHints,
    /// When the request started
    pub started_at: Option<DateTime<Utc>>,
}

impl HttpExchange {
    /// Create an exchange for a request with no response yet
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            request_url: url.to_string(),
            request_method: method.to_string(),
            ..Default::default()
        }
    }

    /// Attach a response status and headers
    pub fn with_response<I, N, V>(mut self, status: u16, headers: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        self.response_status = Some(status);
        self.response_headers = Some(
            headers
                .into_iter()
                .map(|(name, value)| NameValue::new(name, value))
                .collect(),
        );
        self
    }

    /// Response headers, empty when the response is absent
    pub fn headers(&self) -> &[Header] {
        self.response_headers.as_deref().unwrap_or(&[])
    }

    pub fn has_response(&self) -> bool {
        self.response_headers.is_some()
    }
}
