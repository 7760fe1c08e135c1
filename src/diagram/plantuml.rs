//! PlantUML sequence-diagram fragments

use std::fmt::Write;

use super::escape::{escape_plantuml, truncate_and_escape_plantuml};
use super::{
    fetch_mode, marker_participant, note_or_marker, note_participant, raw_length, request_scheme, DiagramError,
    DiagramOptions, ResponseArrow,
};
use crate::format::{format_bytes, format_time, split_by_length, truncate_text};
use crate::models::{EntryView, NameValue};

/// Line break inside a PlantUML note (a literal backslash-n)
const LINE_BREAK: &str = "\\n";
const MAX_PATH_LEN: usize = 70;
const WRAP_LEN: usize = 50;

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
    out.push_str("@enduml\n");
    out
}

pub fn header_and_title(options: &DiagramOptions) -> String {
    let mut out = String::from("@startuml\n");
    if let Some(title) = options.effective_title() {
        out.push_str(&format!("title {title}\n"));
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
        parts.push(truncate_text(&entry.path, MAX_PATH_LEN));
    }
    if options.req_show_scheme {
        parts.push(format!("scheme:{}", request_scheme(&entry.url)));
    }
    if options.req_show_sec_fetch_mode {
        parts.push(format!("fetch-mode:{}", fetch_mode(entry)));
    }

    let mut line = format!("Browser -> \"{}\": {}\n", entry.domain, parts.join(" "));
    if options.lifeline {
        line.push_str(&format!("activate \"{}\"\n", entry.domain));
    }
    line
}

/// `name: value` lines, truncated and escaped, or wrapped at 50 characters
/// and escaped when truncation is off
fn pair_lines(pairs: &[NameValue], truncate: bool, max_len: usize) -> String {
    pairs
        .iter()
        .map(|NameValue { name, value }| {
            if truncate {
                format!(
                    "{}: {}",
                    truncate_and_escape_plantuml(name, max_len),
                    truncate_and_escape_plantuml(value, max_len)
                )
            } else {
                wrap_and_escape(&format!("{name}: {value}"))
            }
        })
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

fn wrap_and_escape(text: &str) -> String {
    escape_plantuml(&split_by_length(text, WRAP_LEN).join(LINE_BREAK))
}

pub fn query_string(entry: &EntryView, options: &DiagramOptions) -> String {
    if !options.add_query_string || entry.request_query_string.is_empty() {
        return String::new();
    }
    note_or_marker(build_query_string(entry, options), "query string", entry, || {
        format!(
            "note over \"{}\": **[Query String Processing Error]**\n",
            marker_participant(entry)
        )
    })
}

fn build_query_string(entry: &EntryView, options: &DiagramOptions) -> Result<String, DiagramError> {
    let participant = note_participant(entry)?;
    let mut note = String::new();
    writeln!(
        note,
        "note over \"{}\": **[Query String]**{LINE_BREAK}{}",
        participant,
        pair_lines(
            &entry.request_query_string,
            options.truncate_query_strings,
            options.truncate_query_strings_length
        )
    )?;
    Ok(note)
}

pub fn post_data(entry: &EntryView, options: &DiagramOptions) -> String {
    if !options.add_post_data || entry.request_post_data.is_none() {
        return String::new();
    }
    note_or_marker(build_post_data(entry, options), "POST data", entry, || {
        format!(
            "note over \"{}\": **[Error processing POST data]**\n",
            marker_participant(entry)
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

    let body = match (&post.params, post.text.as_deref().unwrap_or_default()) {
        (Some(params), _) => pair_lines(params, options.truncate_post_data, max_len),
        (None, text) if options.truncate_post_data => truncate_and_escape_plantuml(text, max_len),
        (None, text) => wrap_and_escape(text),
    };

    let mut note = String::new();
    writeln!(
        note,
        "note over \"{}\": **[postData]** {mime_type}{LINE_BREAK}{body}",
        participant
    )?;
    Ok(note)
}

pub fn request_cookies(entry: &EntryView, options: &DiagramOptions) -> String {
    if !options.add_request_cookies || entry.request_cookies.is_empty() {
        return String::new();
    }
    format!(
        "note over \"{}\": **[Request Cookies]**{LINE_BREAK}{}\n",
        entry.domain,
        pair_lines(
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
        parts.push(entry.response_mime_type.clone());
    }
    if options.res_show_priority {
        if let Some(priority) = entry.priority.as_deref().filter(|p| !p.is_empty()) {
            parts.push(format!("P:{priority}"));
        }
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
        ResponseArrow::Solid => "-> Browser",
        ResponseArrow::Redirect => "--> Browser",
        ResponseArrow::Failure => "--> Browser !!",
    };
    let mut out = format!("\"{}\" {arrow}: {}\n", entry.domain, parts.join(" - "));
    if options.lifeline {
        out.push_str(&format!("deactivate \"{}\"\n", entry.domain));
    }
    out
}

pub fn response_cookies(entry: &EntryView, options: &DiagramOptions) -> String {
    if !options.add_response_cookies || entry.response_cookies.is_empty() {
        return String::new();
    }
    format!(
        "note over Browser: **[Response Cookies]**{LINE_BREAK}{}\n",
        pair_lines(
            &entry.response_cookies,
            options.truncate_response_cookies,
            options.truncate_response_cookies_length
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostData;

    fn bare_options() -> DiagramOptions {
        DiagramOptions {
            auto_number: false,
            lifeline: false,
            res_show_time_formatted: false,
            res_show_size_formatted: false,
            add_request_cookies: true,
            add_response_cookies: true,
            truncate_query_strings_length: 20,
            truncate_post_data_length: 20,
            truncate_request_cookies_length: 20,
            truncate_response_cookies_length: 20,
            ..Default::default()
        }
    }

    fn entry() -> EntryView {
        EntryView {
            url: "https://example.com/api;v=1".to_string(),
            domain: "example.com".to_string(),
            path: "/api;v=1".to_string(),
            method: "POST".to_string(),
            status: 200,
            response_mime_type: "application/json".to_string(),
            priority: Some("high".to_string()),
            time: 123.45,
            response_content_length: Some(1_024),
            ..Default::default()
        }
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<NameValue> {
        items.iter().map(|(n, v)| NameValue::new(*n, *v)).collect()
    }

    #[test]
    fn header_variants() {
        let mut options = bare_options();
        assert_eq!(header_and_title(&options), "@startuml\n");
        options = options.with_title("Test Title");
        assert_eq!(header_and_title(&options), "@startuml\ntitle Test Title\n");
        options.auto_number = true;
        assert_eq!(header_and_title(&options), "@startuml\ntitle Test Title\nautonumber\n");
    }

    #[test]
    fn request_paths_are_not_escaped() {
        let options = DiagramOptions {
            lifeline: true,
            ..bare_options()
        };
        assert_eq!(
            request(&entry(), &options),
            "Browser -> \"example.com\": [POST] /api;v=1\nactivate \"example.com\"\n"
        );
    }

    #[test]
    fn query_notes() {
        let options = bare_options();
        let mut e = entry();
        assert_eq!(query_string(&e, &options), "");

        e.request_query_string = pairs(&[("param", "value"), ("emptyParam", "")]);
        assert_eq!(
            query_string(&e, &options),
            "note over \"example.com\": **[Query String]**\\nparam: value\\nemptyParam: \n"
        );

        e.request_query_string = pairs(&[("param:with:colons", "value\nwith\nnewlines")]);
        let untruncated = DiagramOptions {
            truncate_query_strings: false,
            ..bare_options()
        };
        assert_eq!(
            query_string(&e, &untruncated),
            "note over \"example.com\": **[Query String]**\\nparam&#58;with&#58;colons&#58; value\\nwith\\nnewlines\n"
        );
    }

    #[test]
    fn post_data_notes() {
        let mut e = entry();
        assert_eq!(post_data(&e, &bare_options()), "");

        e.request_post_data = Some(PostData {
            mime_type: Some("text/plain".to_string()),
            text: Some("plain text content".to_string()),
            params: None,
        });
        let untruncated = DiagramOptions {
            truncate_post_data: false,
            ..bare_options()
        };
        assert_eq!(
            post_data(&e, &untruncated),
            "note over \"example.com\": **[postData]** text/plain\\nplain text content\n"
        );

        e.request_post_data = Some(PostData {
            mime_type: Some("application/json".to_string()),
            text: None,
            params: Some(pairs(&[("key1", "value1"), ("key2", "value2")])),
        });
        assert_eq!(
            post_data(&e, &bare_options()),
            "note over \"example.com\": **[postData]** application/json\\nkey1: value1\\nkey2: value2\n"
        );

        e.request_post_data = Some(PostData::default());
        assert_eq!(post_data(&e, &bare_options()), "note over \"example.com\": **[postData]** unknown\\n\n");
    }

    #[test]
    fn long_post_text_is_wrapped_when_not_truncated() {
        let mut e = entry();
        e.request_post_data = Some(PostData {
            mime_type: Some("text/csv".to_string()),
            text: Some("a".repeat(120)),
            params: None,
        });
        let untruncated = DiagramOptions {
            truncate_post_data: false,
            ..bare_options()
        };
        let expected = format!(
            "note over \"example.com\": **[postData]** text/csv\\n{}\\n{}\\n{}\n",
            "a".repeat(50),
            "a".repeat(50),
            "a".repeat(20)
        );
        assert_eq!(post_data(&e, &untruncated), expected);
        assert_eq!(
            post_data(&e, &bare_options()),
            format!("note over \"example.com\": **[postData]** text/csv\\n{}...\n", "a".repeat(20))
        );
    }

    #[test]
    fn hostless_entries_get_error_markers() {
        let options = bare_options();
        let inline = EntryView {
            url: "blob:1f2e3d".to_string(),
            domain: String::new(),
            request_query_string: pairs(&[("x", "1")]),
            request_post_data: Some(PostData {
                mime_type: Some("application/json".to_string()),
                params: Some(vec![]),
                ..Default::default()
            }),
            ..entry()
        };

        assert_eq!(
            query_string(&inline, &options),
            "note over \"unknown\": **[Query String Processing Error]**\n"
        );
        assert_eq!(
            post_data(&inline, &options),
            "note over \"unknown\": **[Error processing POST data]**\n"
        );
    }

    #[test]
    fn cookie_notes() {
        let mut e = entry();
        assert_eq!(request_cookies(&e, &bare_options()), "");
        assert_eq!(response_cookies(&e, &bare_options()), "");

        e.request_cookies = pairs(&[("cookieName", "cookieValue")]);
        e.response_cookies = pairs(&[("cookie1", "value1"), ("cookie2", "value2")]);
        assert_eq!(
            request_cookies(&e, &bare_options()),
            "note over \"example.com\": **[Request Cookies]**\\ncookieName: cookieValue\n"
        );
        assert_eq!(
            response_cookies(&e, &bare_options()),
            "note over Browser: **[Response Cookies]**\\ncookie1: value1\\ncookie2: value2\n"
        );

        e.request_cookies = pairs(&[("cookie:name", "cookie\nvalue")]);
        let untruncated = DiagramOptions {
            truncate_request_cookies: false,
            ..bare_options()
        };
        assert_eq!(
            request_cookies(&e, &untruncated),
            "note over \"example.com\": **[Request Cookies]**\\ncookie&#58;name&#58; cookie\\nvalue\n"
        );
    }

    #[test]
    fn response_arrows() {
        let options = bare_options();
        let mut e = entry();
        assert_eq!(response(&e, &options), "\"example.com\" -> Browser: 200 - application/json\n");
        e.status = 302;
        e.response_mime_type = "text/plain".to_string();
        assert_eq!(response(&e, &options), "\"example.com\" --> Browser: 302 - text/plain\n");
        e.status = 500;
        e.response_mime_type = "text/html".to_string();
        assert_eq!(response(&e, &options), "\"example.com\" --> Browser !!: 500 - text/html\n");

        let with_lifeline = DiagramOptions {
            lifeline: true,
            ..bare_options()
        };
        e.status = 200;
        assert_eq!(
            response(&e, &with_lifeline),
            "\"example.com\" -> Browser: 200 - text/html\ndeactivate \"example.com\"\n"
        );
    }

    #[test]
    fn priority_only_when_known() {
        let options = DiagramOptions {
            res_show_priority: true,
            res_show_size_bytes: true,
            ..bare_options()
        };
        let mut e = entry();
        assert_eq!(
            response(&e, &options),
            "\"example.com\" -> Browser: 200 - application/json - P:high - 1024bytes\n"
        );
        e.priority = None;
        assert_eq!(response(&e, &options), "\"example.com\" -> Browser: 200 - application/json - 1024bytes\n");
    }
}
