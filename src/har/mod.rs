//! HAR import
//!
//! Reads HTTP Archive 1.2 documents (plus the Chrome-specific underscore
//! fields) into the exchange model used by the analysis engines and the view
//! model used by the diagram generators.

pub mod post_data;
pub mod url;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::models::{CacheHints, EntryView, HttpExchange, NameValue};
use self::post_data::{normalize_post_data, CapturedPostData};
use self::url::UrlParts;

#[derive(Debug, Error)]
pub enum HarError {
    #[error("failed to read HAR file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse HAR JSON: {0}")]
    Syntax(#[source] serde_json::Error),
    #[error("invalid HAR structure: {0}")]
    Structure(#[source] serde_json::Error),
    #[error("HAR file contains no entries")]
    Empty,
}

/// One imported entry, in both engine and display form
#[derive(Debug, Clone)]
pub struct HarEntry {
    pub exchange: HttpExchange,
    pub view: EntryView,
}

#[derive(Deserialize)]
struct RawHar {
    log: RawHarLog,
}

#[derive(Deserialize)]
struct RawHarLog {
    #[serde(default)]
    entries: Vec<RawHarEntry>,
}

#[derive(Deserialize)]
struct RawHarEntry {
    #[serde(rename = "startedDateTime")]
    started_datetime: Option<String>,
    time: Option<f64>,
    #[serde(default)]
    request: RawHarRequest,
    response: Option<RawHarResponse>,
    cache: Option<RawHarCache>,
    #[serde(rename = "_priority")]
    priority: Option<String>,
    #[serde(rename = "_fromDiskCache")]
    browser_cache_flag: Option<bool>,
    #[serde(rename = "fromDiskCache")]
    from_disk_cache: Option<bool>,
    #[serde(rename = "_resourceType")]
    resource_type: Option<String>,
    #[serde(rename = "_webSocketMessages")]
    websocket_messages: Option<Value>,
}

#[derive(Default, Deserialize)]
struct RawHarRequest {
    method: Option<String>,
    url: Option<String>,
    headers: Option<Vec<RawNameValue>>,
    #[serde(rename = "queryString")]
    query_string: Option<Vec<RawNameValue>>,
    cookies: Option<Vec<RawNameValue>>,
    #[serde(rename = "postData")]
    post_data: Option<RawHarPostData>,
}

#[derive(Deserialize)]
struct RawHarPostData {
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
    text: Option<String>,
    encoding: Option<String>,
    params: Option<Vec<RawNameValue>>,
}

#[derive(Deserialize)]
struct RawHarResponse {
    status: Option<i64>,
    headers: Option<Vec<RawNameValue>>,
    cookies: Option<Vec<RawNameValue>>,
    content: Option<RawHarContent>,
}

#[derive(Deserialize)]
struct RawHarContent {
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
    size: Option<i64>,
}

#[derive(Deserialize)]
struct RawHarCache {
    #[serde(rename = "beforeRequest")]
    before_request: Option<Value>,
}

/// Name/value pair that tolerates numbers, booleans and nulls
#[derive(Deserialize)]
struct RawNameValue {
    #[serde(default, deserialize_with = "lenient_string")]
    name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    value: String,
}

impl From<RawNameValue> for NameValue {
    fn from(raw: RawNameValue) -> Self {
        NameValue::new(raw.name, raw.value)
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    })
}

fn pairs(raw: Option<Vec<RawNameValue>>) -> Vec<NameValue> {
    raw.unwrap_or_default().into_iter().map(NameValue::from).collect()
}

/// Convert a parsed HAR document into entries
pub fn har_to_entries(value: &Value) -> Result<Vec<HarEntry>, HarError> {
    let raw = RawHar::deserialize(value).map_err(HarError::Structure)?;
    let entries: Vec<HarEntry> = raw.log.entries.into_iter().map(convert_entry).collect();
    tracing::debug!(entries = entries.len(), "imported HAR entries");
    Ok(entries)
}

pub fn import_har_from_str(contents: &str) -> Result<Vec<HarEntry>, HarError> {
    let value: Value = serde_json::from_str(contents).map_err(HarError::Syntax)?;
    let entries = har_to_entries(&value)?;
    if entries.is_empty() {
        Err(HarError::Empty)
    } else {
        Ok(entries)
    }
}

pub fn import_har_from_path(path: impl AsRef<Path>) -> Result<Vec<HarEntry>, HarError> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).map_err(|source| HarError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    import_har_from_str(&data)
}

fn convert_entry(raw: RawHarEntry) -> HarEntry {
    let request = raw.request;
    let url = request.url.unwrap_or_default();
    let method = request.method.unwrap_or_else(|| "GET".to_string());
    let parts = UrlParts::parse(&url);
    if parts.is_none() && !url.is_empty() {
        tracing::warn!(url = %url, "HAR entry URL has no host");
    }

    let query_string = match request.query_string {
        Some(query) if !query.is_empty() => pairs(Some(query)),
        _ => parts.as_ref().map(UrlParts::query_pairs).unwrap_or_default(),
    };

    let request_post_data = request.post_data.and_then(|post| {
        normalize_post_data(&CapturedPostData {
            mime_type: post.mime_type,
            text: post.text,
            encoding: post.encoding,
            params: post.params.map(|params| params.into_iter().map(NameValue::from).collect()),
        })
    });

    let (response_status, response_headers, response_cookies, content) = match raw.response {
        Some(response) => (
            response
                .status
                .and_then(|status| u16::try_from(status).ok())
                .filter(|status| *status > 0),
            Some(pairs(response.headers)),
            pairs(response.cookies),
            response.content,
        ),
        None => (None, None, Vec::new(), None),
    };

    let cache_hints = CacheHints {
        browser_cache_flag: raw.browser_cache_flag,
        cache_before_request: raw
            .cache
            .and_then(|cache| cache.before_request)
            .is_some_and(|before| !matches!(before, Value::Null | Value::Bool(false))),
        resource_type: raw.resource_type,
        from_disk_cache: raw.from_disk_cache,
    };

    let started_at = raw
        .started_datetime
        .as_deref()
        .and_then(|started| DateTime::parse_from_rfc3339(started).ok())
        .map(|started| started.with_timezone(&Utc));

    let (response_mime_type, response_content_length) = content
        .map(|content| {
            (
                content.mime_type.unwrap_or_default(),
                content.size.filter(|size| *size >= 0),
            )
        })
        .unwrap_or_default();

    let view = EntryView {
        url: url.clone(),
        domain: parts.as_ref().map(|p| p.host.clone()).unwrap_or_default(),
        path: parts.as_ref().map(|p| p.path.clone()).unwrap_or_default(),
        method: method.clone(),
        status: response_status.unwrap_or(0),
        response_mime_type,
        priority: raw.priority.filter(|priority| !priority.is_empty()),
        time: raw.time.unwrap_or(0.0).max(0.0),
        response_content_length,
        request_headers: pairs(request.headers),
        request_query_string: query_string,
        request_post_data,
        request_cookies: pairs(request.cookies),
        response_cookies,
        is_websocket: raw.websocket_messages.is_some(),
    };

    let exchange = HttpExchange {
        request_url: url,
        request_method: method,
        response_status,
        response_headers,
        cache_hints,
        started_at,
    };

    HarEntry { exchange, view }
}
