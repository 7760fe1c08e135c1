use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cut-off for truncated note values
pub const DEFAULT_TRUNCATE_LENGTH: usize = 50;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to read diagram options from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid diagram options in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Rendering toggles for a sequence diagram.
///
/// Every field has a default, so a JSON options file only needs the keys it
/// wants to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagramOptions {
    pub add_title: bool,
    pub title: String,
    pub auto_number: bool,
    pub lifeline: bool,

    // Request arrow label
    pub req_show_method: bool,
    pub req_show_path: bool,
    pub req_show_scheme: bool,
    pub req_show_sec_fetch_mode: bool,

    // Response arrow label
    pub res_show_status: bool,
    pub res_show_mime_type: bool,
    pub res_show_priority: bool,
    pub res_show_time_formatted: bool,
    pub res_show_time_ms: bool,
    pub res_show_size_formatted: bool,
    pub res_show_size_bytes: bool,

    pub add_query_string: bool,
    pub truncate_query_strings: bool,
    pub truncate_query_strings_length: usize,

    pub add_post_data: bool,
    pub truncate_post_data: bool,
    pub truncate_post_data_length: usize,

    pub add_request_cookies: bool,
    pub truncate_request_cookies: bool,
    pub truncate_request_cookies_length: usize,

    pub add_response_cookies: bool,
    pub truncate_response_cookies: bool,
    pub truncate_response_cookies_length: usize,
}

impl Default for DiagramOptions {
    fn default() -> Self {
        Self {
            add_title: false,
            title: String::new(),
            auto_number: true,
            lifeline: true,
            req_show_method: true,
            req_show_path: true,
            req_show_scheme: false,
            req_show_sec_fetch_mode: false,
            res_show_status: true,
            res_show_mime_type: true,
            res_show_priority: false,
            res_show_time_formatted: true,
            res_show_time_ms: false,
            res_show_size_formatted: true,
            res_show_size_bytes: false,
            add_query_string: true,
            truncate_query_strings: true,
            truncate_query_strings_length: DEFAULT_TRUNCATE_LENGTH,
            add_post_data: true,
            truncate_post_data: true,
            truncate_post_data_length: DEFAULT_TRUNCATE_LENGTH,
            add_request_cookies: false,
            truncate_request_cookies: true,
            truncate_request_cookies_length: DEFAULT_TRUNCATE_LENGTH,
            add_response_cookies: false,
            truncate_response_cookies: true,
            truncate_response_cookies_length: DEFAULT_TRUNCATE_LENGTH,
        }
    }
}

impl DiagramOptions {
    /// Load options from a JSON file; missing keys keep their defaults
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, OptionsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| OptionsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| OptionsError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Set the title and switch title output on
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self.add_title = true;
        self
    }

    /// Title text to emit, if any
    pub fn effective_title(&self) -> Option<&str> {
        Some(self.title.as_str()).filter(|title| self.add_title && !title.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_json_keeps_defaults() {
        let options: DiagramOptions =
            serde_json::from_str(r#"{"addRequestCookies": true, "truncatePostDataLength": 20}"#).unwrap();
        assert!(options.add_request_cookies);
        assert_eq!(options.truncate_post_data_length, 20);
        assert!(options.lifeline);
        assert_eq!(options.truncate_query_strings_length, DEFAULT_TRUNCATE_LENGTH);
    }

    #[test]
    fn title_needs_flag_and_text() {
        assert_eq!(DiagramOptions::default().effective_title(), None);
        assert_eq!(DiagramOptions::default().with_title("").effective_title(), None);
        assert_eq!(
            DiagramOptions::default().with_title("Checkout").effective_title(),
            Some("Checkout")
        );
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"reqShowScheme": true, "autoNumber": false}}"#).unwrap();
        let options = DiagramOptions::from_json_path(file.path()).unwrap();
        assert!(options.req_show_scheme);
        assert!(!options.auto_number);
    }

    #[test]
    fn file_errors_name_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let err = DiagramOptions::from_json_path(&missing).unwrap_err();
        assert!(matches!(err, OptionsError::Io { .. }));
        assert!(err.to_string().contains("missing.json"));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(matches!(
            DiagramOptions::from_json_path(&bad).unwrap_err(),
            OptionsError::Json { .. }
        ));
    }
}
