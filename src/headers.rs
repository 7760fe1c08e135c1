//! Case-insensitive header lookup
//!
//! Built once per exchange and shared by the classifier and the freshness
//! calculator. Where a header name repeats, the first occurrence wins.

use std::collections::HashMap;

use crate::models::Header;

pub struct HeaderLookup<'a> {
    raw: &'a [Header],
    /// Lowercased names in first-seen order, each with its first value
    ordered: Vec<(String, &'a str)>,
    index: HashMap<String, usize>,
}

impl<'a> HeaderLookup<'a> {
    pub fn new(headers: &'a [Header]) -> Self {
        let mut ordered = Vec::with_capacity(headers.len());
        let mut index = HashMap::with_capacity(headers.len());
        for header in headers {
            let name = header.name.to_ascii_lowercase();
            if !index.contains_key(&name) {
                index.insert(name.clone(), ordered.len());
                ordered.push((name, header.value.as_str()));
            }
        }
        Self {
            raw: headers,
            ordered,
            index,
        }
    }

    /// Value of the first header with this name. `name` must be lowercase.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.index.get(name).map(|&i| self.ordered[i].1)
    }

    /// Value of the first header with this name, or an empty string
    pub fn get_or_empty(&self, name: &str) -> &'a str {
        self.get(name).unwrap_or("")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Whether any header (duplicates included) with this name has a value
    /// containing `needle`, ignoring case. `needle` must be lowercase.
    pub fn any_value_contains(&self, name: &str, needle: &str) -> bool {
        self.raw.iter().any(|header| {
            header.name.eq_ignore_ascii_case(name)
                && header.value.to_ascii_lowercase().contains(needle)
        })
    }

    /// Unique lowercased header names with their first values, in capture order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &'a str)> + '_ {
        self.ordered.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Whether `haystack` contains `needle`, ignoring ASCII case. `needle` must be lowercase.
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NameValue;

    fn headers(pairs: &[(&str, &str)]) -> Vec<Header> {
        pairs.iter().map(|(n, v)| NameValue::new(*n, *v)).collect()
    }

    #[test]
    fn lookup_is_case_insensitive_and_first_match_wins() {
        let raw = headers(&[
            ("X-Cache", "HIT"),
            ("Server", "nginx"),
            ("x-cache", "MISS"),
        ]);
        let lookup = HeaderLookup::new(&raw);

        assert_eq!(lookup.get("x-cache"), Some("HIT"));
        assert_eq!(lookup.get("server"), Some("nginx"));
        assert!(lookup.contains("x-cache"));
        assert!(!lookup.contains("via"));
        assert_eq!(lookup.get_or_empty("via"), "");

        let names: Vec<_> = lookup.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["x-cache", "server"]);
    }

    #[test]
    fn value_scan_includes_duplicates() {
        let raw = headers(&[("x-cache", "MISS"), ("X-Cache", "TCP_HIT from akamai")]);
        let lookup = HeaderLookup::new(&raw);
        assert!(lookup.any_value_contains("x-cache", "tcp_hit"));
        assert!(!lookup.any_value_contains("via", "google"));
    }
}
