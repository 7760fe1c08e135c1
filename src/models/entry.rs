//! Per-entry view model consumed by the diagram generators

use serde::{Deserialize, Serialize};

use super::exchange::{Header, NameValue};

/// Request body as normalized for display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostData {
    pub mime_type: Option<String>,
    pub text: Option<String>,
    /// Present for form and JSON bodies; an empty list still counts as present
    pub params: Option<Vec<NameValue>>,
}

/// Flattened view of one HAR entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryView {
    pub url: String,
    /// Host name, without port
    pub domain: String,
    /// URL path, without query or fragment
    pub path: String,
    pub method: String,
    /// HTTP status, 0 when there was no response
    pub status: u16,
    pub response_mime_type: String,
    pub priority: Option<String>,
    /// Total time in milliseconds
    pub time: f64,
    pub response_content_length: Option<i64>,
    pub request_headers: Vec<Header>,
    pub request_query_string: Vec<NameValue>,
    pub request_post_data: Option<PostData>,
    pub request_cookies: Vec<NameValue>,
    pub response_cookies: Vec<NameValue>,
    /// The capture recorded WebSocket frames for this entry
    #[serde(default)]
    pub is_websocket: bool,
}

impl EntryView {
    /// First request header with the given name (case-insensitive)
    pub fn request_header(&self, name: &str) -> Option<&str> {
        self.request_headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }
}
