//! Minimal URL splitting for captured request URLs

use crate::models::NameValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Path without query or fragment, `/` when empty
    pub path: String,
    pub query: Option<String>,
}

impl UrlParts {
    /// Split an absolute URL. Returns `None` when there is no `scheme://`
    /// prefix or no host.
    pub fn parse(url: &str) -> Option<Self> {
        let (scheme, remainder) = url.split_once("://")?;
        if !is_valid_scheme(scheme) {
            return None;
        }

        let authority_end = remainder
            .find(|c| matches!(c, '/' | '?' | '#'))
            .unwrap_or(remainder.len());
        let (authority, rest) = remainder.split_at(authority_end);
        // userinfo never reaches the host
        let authority = authority.rsplit_once('@').map_or(authority, |(_, a)| a);
        let (host, port) = split_host_port(authority, scheme);
        if host.is_empty() {
            return None;
        }

        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (rest, None),
        };

        Some(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            port,
            path: if path.is_empty() {
                "/".to_string()
            } else {
                path.to_string()
            },
            query,
        })
    }

    /// Decoded query parameters in URL order
    pub fn query_pairs(&self) -> Vec<NameValue> {
        self.query.as_deref().map(split_query).unwrap_or_default()
    }
}

/// Host name of an absolute URL, if it has one
pub fn hostname(url: &str) -> Option<String> {
    UrlParts::parse(url).map(|parts| parts.host)
}

/// Leading `scheme:` of a URL, accepting opaque forms such as `data:` or `blob:`
pub fn scheme_prefix(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once(':')?;
    is_valid_scheme(scheme).then_some(scheme)
}

fn is_valid_scheme(scheme: &str) -> bool {
    !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn split_host_port(authority: &str, scheme: &str) -> (String, u16) {
    if authority.is_empty() {
        return (String::new(), default_port(scheme));
    }

    if authority.starts_with('[') {
        if let Some(end) = authority.find(']') {
            let host = authority[..=end].to_string();
            let remainder = &authority[end + 1..];
            if let Some(stripped) = remainder.strip_prefix(':') {
                if let Ok(port) = stripped.parse::<u16>() {
                    return (host, port);
                }
            }
            return (host, default_port(scheme));
        }
    }

    if let Some((host, port)) = authority.rsplit_once(':') {
        if let Ok(port) = port.parse::<u16>() {
            return (host.to_string(), port);
        }
    }

    (authority.to_string(), default_port(scheme))
}

fn default_port(scheme: &str) -> u16 {
    if scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("wss") {
        443
    } else {
        80
    }
}

/// Split an `a=1&b=2` string into decoded pairs
pub fn split_query(query: &str) -> Vec<NameValue> {
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (name, value) = segment.split_once('=').unwrap_or((segment, ""));
            NameValue::new(percent_decode(name), percent_decode(value))
        })
        .collect()
}

/// Decode `%XX` escapes and `+` as space; malformed escapes pass through
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                if let (Some(h), Some(l)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    output.push(h << 4 | l);
                    i += 3;
                    continue;
                }
                output.push(b'%');
                i += 1;
            }
            b'+' => {
                output.push(b' ');
                i += 1;
            }
            byte => {
                output.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&output).into_owned()
}

/// Strict percent-decoding for URI components: `+` stays as is, and a
/// malformed escape or invalid UTF-8 makes the whole input undecodable.
pub fn decode_uri_component(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let high = bytes.get(i + 1).copied().and_then(hex_value)?;
            let low = bytes.get(i + 2).copied().and_then(hex_value)?;
            output.push(high << 4 | low);
            i += 3;
        } else {
            output.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(output).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
