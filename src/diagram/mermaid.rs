//! Mermaid `sequenceDiagram` fragments

use std::fmt::Write;

use once_cell::sync::Lazy;
use regex::Regex;

use super::escape::{escape_mermaid, truncate_and_escape_mermaid};
use super::{
    fetch_mode, marker_participant, note_or_marker, note_participant, raw_length, request_scheme, DiagramError,
    DiagramOptions, ResponseArrow,
};
use crate::format::{format_bytes, format_time, split_by_length, truncate_text};
use crate::models::{EntryView, NameValue};

const LINE_BREAK: &str = "<br>";
const MAX_PATH_LEN: usize = 70;
const COOKIE_WRAP_LEN: usize = 50;

/// Backslash, `=` or `&` in a body value usually means it was never URL-decoded
static URL_ENCODED_HINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\\=&]").expect("Invalid regex pattern"));

pub fn render(entries: &[EntryView], options: &DiagramOptions) -> String {
    let mut out = header_and_title(options);
    for entry in entries {
        out.push_str(&request(entry, options));
        out.push_str(&query_string(entry, options));
        out.push_str(&post_data(entry, options));
        out.push_str(&request_cookies(entry, options));
        out.push_str(&response(entry, options));
        out.push_str(&response_cookies(entry, options));
    }
    out
}

pub fn header_and_title(options: &DiagramOptions) -> String {
    let mut out = String::from("sequenceDiagram\n");
    if let Some(title) = options.effective_title() {
        out.push_str(&format!("title: {title}\n"));
    }
    if options.auto_number {
        out.push_str("autonumber\n");
    }
    out
}

pub fn request(entry: &EntryView, options: &DiagramOptions) -> String {
    let mut parts = Vec::new();
    if options.req_show_method {
        parts.push(format!("[{}]", entry.method));
    }
    if options.req_show_path {
        parts.push(label_safe_path(&truncate_text(&entry.path, MAX_PATH_LEN)));
    }
    if options.req_show_scheme {
        parts.push(format!("scheme:{}", request_scheme(&entry.url)));
    }
    if options.req_show_sec_fetch_mode {
        parts.push(format!("fetch-mode:{}", fetch_mode(entry)));
    }

    let mut line = format!("Browser->>{}: {}\n", entry.domain, parts.join(" "));
    if options.lifeline {
        line.push_str(&format!("  activate {}\n", entry.domain));
    }
    line
}

/// `#` and `;` would end the label early; both become Mermaid entity codes
/// in a single pass so the inserted `;` is left alone
fn label_safe_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '#' => out.push_str("#35;"),
            ';' => out.push_str("#59;"),
            _ => out.push(c),
        }
    }
    out
}

fn is_complex_query_value(value: &str) -> bool {
    value.contains(['|', '{', '}'])
}

pub fn query_string(entry: &EntryView, options: &DiagramOptions) -> String {
    if !options.add_query_string || entry.request_query_string.is_empty() {
        return String::new();
    }
    note_or_marker(build_query_string(entry, options), "query string", entry, || {
        format!(
            "note over {}: [Query String Processing Error]\n",
            escape_mermaid(marker_participant(entry))
        )
    })
}

fn build_query_string(entry: &EntryView, options: &DiagramOptions) -> Result<String, DiagramError> {
    let participant = note_participant(entry)?;
    let max_len = options.truncate_query_strings_length;
    let lines: Vec<String> = entry
        .request_query_string
        .iter()
        .map(|NameValue { name, value }| {
            if is_complex_query_value(value) {
                format!("{}: [Complex Value]", escape_mermaid(name))
            } else if options.truncate_query_strings {
                format!(
                    "{}: {}",
                    truncate_and_escape_mermaid(name, max_len),
                    truncate_and_escape_mermaid(value, max_len)
                )
            } else {
                format!("{}: {}", escape_mermaid(name), escape_mermaid(value))
            }
        })
        .collect();

    let mut note = String::new();
    writeln!(
        note,
        "note over {}: [Query String]{LINE_BREAK}{}",
        escape_mermaid(participant),
        lines.join(LINE_BREAK)
    )?;
    Ok(note)
}

pub fn post_data(entry: &EntryView, options: &DiagramOptions) -> String {
    if !options.add_post_data || entry.request_post_data.is_none() {
        return String::new();
    }
    note_or_marker(build_post_data(entry, options), "POST data", entry, || {
        format!(
            "note over {}: [Error processing POST data]\n",
            escape_mermaid(marker_participant(entry))
        )
    })
}

fn build_post_data(entry: &EntryView, options: &DiagramOptions) -> Result<String, DiagramError> {
    let Some(post) = entry.request_post_data.as_ref() else {
        return Ok(String::new());
    };
    let participant = note_participant(entry)?;
    let max_len = options.truncate_post_data_length;
    let mime_type = post
        .mime_type
        .as_deref()
        .filter(|mime| !mime.is_empty())
        .unwrap_or("unknown");

    let body = if let Some(params) = &post.params {
        params
            .iter()
            .map(|NameValue { name, value }| {
                if URL_ENCODED_HINT.is_match(value) {
                    return format!("{name}: [URL-encoded value]");
                }
                let escaped = escape_mermaid(value);
                if options.truncate_post_data {
                    format!("{}: {}", truncate_text(name, max_len), truncate_text(&escaped, max_len))
                } else {
                    format!("{name}: {escaped}")
                }
            })
            .collect::<Vec<_>>()
            .join(LINE_BREAK)
    } else if let Some(text) = post.text.as_deref().filter(|text| !text.is_empty()) {
        let trimmed = text.trim();
        if mime_type.contains("json") || trimmed.starts_with('{') || trimmed.starts_with("\\{\\") {
            "[Complex JSON Data]".to_string()
        } else if mime_type.contains("text/plain") {
            if URL_ENCODED_HINT.is_match(text) {
                "[URL-encoded data]".to_string()
            } else {
                escape_mermaid(text)
            }
        } else if options.truncate_post_data {
            truncate_text(&escape_mermaid(text), max_len)
        } else {
            escape_mermaid(text)
        }
    } else {
        String::new()
    };

    let mut note = String::new();
    write!(note, "note over {}: [postData] {mime_type}", escape_mermaid(participant))?;
    if !body.is_empty() {
        write!(note, "{LINE_BREAK}{body}")?;
    }
    note.push('\n');
    Ok(note)
}

fn cookie_lines(cookies: &[NameValue], truncate: bool, max_len: usize) -> String {
    cookies
        .iter()
        .map(|NameValue { name, value }| {
            if truncate {
                format!(
                    "{}: {}",
                    truncate_and_escape_mermaid(name, max_len),
                    truncate_and_escape_mermaid(value, max_len)
                )
            } else {
                split_by_length(&format!("{name}: {value}"), COOKIE_WRAP_LEN)
                    .iter()
                    .map(|chunk| escape_mermaid(chunk))
                    .collect::<Vec<_>>()
                    .join(LINE_BREAK)
            }
        })
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

pub fn request_cookies(entry: &EntryView, options: &DiagramOptions) -> String {
    if !options.add_request_cookies || entry.request_cookies.is_empty() {
        return String::new();
    }
    format!(
        "note over {}: [Request Cookies]{LINE_BREAK}{}\n",
        entry.domain,
        cookie_lines(
            &entry.request_cookies,
            options.truncate_request_cookies,
            options.truncate_request_cookies_length
        )
    )
}

pub fn response(entry: &EntryView, options: &DiagramOptions) -> String {
    let mut parts = Vec::new();
    if options.res_show_status {
        parts.push(entry.status.to_string());
    }
    if options.res_show_mime_type {
        parts.push(entry.response_mime_type.replace(';', "#59;"));
    }
    if options.res_show_priority {
        parts.push(entry.priority.clone().unwrap_or_else(|| "-".to_string()));
    }
    if options.res_show_time_formatted {
        parts.push(format_time(entry.time));
    }
    if options.res_show_time_ms {
        parts.push(format!("{}ms", entry.time.round() as i64));
    }
    if options.res_show_size_formatted {
        parts.push(format_bytes(entry.response_content_length));
    }
    if options.res_show_size_bytes {
        parts.push(format!("{}bytes", raw_length(entry.response_content_length)));
    }

    let arrow = match ResponseArrow::for_status(entry.status) {
        ResponseArrow::Solid => "->>",
        ResponseArrow::Redirect => "-->>",
        ResponseArrow::Failure => "--x",
    };
    let mut out = format!("{} {arrow} Browser: {}\n", entry.domain, parts.join(" - "));
    if options.lifeline {
        out.push_str(&format!("  deactivate {}\n", entry.domain));
    }
    out
}

pub fn response_cookies(entry: &EntryView, options: &DiagramOptions) -> String {
    if !options.add_response_cookies || entry.response_cookies.is_empty() {
        return String::new();
    }
    format!(
        "note over Browser: [Response Cookies]{LINE_BREAK}{}\n",
        cookie_lines(
            &entry.response_cookies,
            options.truncate_response_cookies,
            options.truncate_response_cookies_length
        )
    )
}
