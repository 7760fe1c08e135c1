//! Per-entry analysis records
//!
//! Bundles the CDN classification, freshness lanes and a few display fields
//! for each imported entry, as printed by the command line tool.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cdn::{analyze_cdn, CdnClassification};
use crate::freshness::{calculate_freshness_at, FreshnessResult};
use crate::har::url::UrlParts;
use crate::har::HarEntry;
use crate::models::EntryView;
use crate::status::describe_status;

const FONT_EXTENSIONS: &[&str] = &[".ttf", ".otf", ".woff", ".woff2", ".eot"];
const MEDIA_EXTENSIONS: &[&str] = &[
    ".mp3", ".mp4", ".wav", ".ogg", ".m4a", ".m4v", ".webm", ".oga", ".ogv",
];

/// DevTools-style resource category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommunicationType {
    #[serde(rename = "WS")]
    WebSocket,
    Img,
    Doc,
    Manifest,
    #[serde(rename = "Fetch/XHR")]
    FetchXhr,
    #[serde(rename = "CSS")]
    Css,
    #[serde(rename = "JS")]
    Js,
    Font,
    Media,
    Wasm,
    Other,
}

impl CommunicationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationType::WebSocket => "WS",
            CommunicationType::Img => "Img",
            CommunicationType::Doc => "Doc",
            CommunicationType::Manifest => "Manifest",
            CommunicationType::FetchXhr => "Fetch/XHR",
            CommunicationType::Css => "CSS",
            CommunicationType::Js => "JS",
            CommunicationType::Font => "Font",
            CommunicationType::Media => "Media",
            CommunicationType::Wasm => "Wasm",
            CommunicationType::Other => "Other",
        }
    }
}

impl fmt::Display for CommunicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorize an entry from its response MIME type, falling back to the
/// URL path extension
pub fn communication_type(entry: &EntryView) -> CommunicationType {
    if entry.is_websocket {
        return CommunicationType::WebSocket;
    }

    let path = UrlParts::parse(&entry.url)
        .map(|parts| parts.path)
        .unwrap_or_else(|| entry.url.clone())
        .to_ascii_lowercase();
    if path.ends_with("favicon.ico") {
        return CommunicationType::Other;
    }

    let mime = entry.response_mime_type.to_ascii_lowercase();
    if mime.is_empty() {
        return CommunicationType::Other;
    }
    let mime_has = |needles: &[&str]| needles.iter().any(|needle| mime.contains(needle));
    let path_ends = |extensions: &[&str]| extensions.iter().any(|ext| path.ends_with(ext));

    if mime_has(&["image/svg"]) || path_ends(&[".svg"]) {
        CommunicationType::Img
    } else if mime_has(&["html", "xml"]) {
        CommunicationType::Doc
    } else if mime_has(&["manifest"]) {
        CommunicationType::Manifest
    } else if mime_has(&["json"]) {
        CommunicationType::FetchXhr
    } else if mime_has(&["css", "style"]) {
        CommunicationType::Css
    } else if mime_has(&["javascript", "ecmascript", "module"]) || path_ends(&[".js", ".mjs"]) {
        CommunicationType::Js
    } else if mime_has(&["font"]) || path_ends(FONT_EXTENSIONS) {
        CommunicationType::Font
    } else if mime_has(&["audio", "video", "application/ogg", "mpegurl"]) || path_ends(MEDIA_EXTENSIONS) {
        CommunicationType::Media
    } else if mime_has(&["wasm"]) || path_ends(&[".wasm"]) {
        CommunicationType::Wasm
    } else if mime_has(&["image"]) {
        CommunicationType::Img
    } else {
        CommunicationType::Other
    }
}

/// Analysis of one entry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryReport {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub status_description: Option<String>,
    pub communication_type: CommunicationType,
    pub cdn: CdnClassification,
    pub freshness: FreshnessResult,
}

impl EntryReport {
    pub fn from_entry(entry: &HarEntry, now: DateTime<Utc>) -> Self {
        let view = &entry.view;
        Self {
            url: view.url.clone(),
            method: view.method.clone(),
            status: view.status,
            status_description: describe_status(i64::from(view.status)).ok(),
            communication_type: communication_type(view),
            cdn: analyze_cdn(&entry.exchange),
            freshness: calculate_freshness_at(&entry.exchange, now),
        }
    }
}

/// Reports for every entry, evaluated against the same clock reading
pub fn build_reports(entries: &[HarEntry], now: DateTime<Utc>) -> Vec<EntryReport> {
    entries
        .iter()
        .map(|entry| EntryReport::from_entry(entry, now))
        .collect()
}
