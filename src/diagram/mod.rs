//! Sequence-diagram source generation
//!
//! Turns a list of [`EntryView`]s into Mermaid or PlantUML sequence-diagram
//! text. Each syntax has its own fragment generators and escaping grammar;
//! [`render_diagram`] stitches the fragments together in timeline order.

pub mod escape;
pub mod mermaid;
pub mod options;
pub mod plantuml;

pub use escape::{escape_freeform, escape_mermaid, escape_plantuml};
pub use options::{DiagramOptions, OptionsError};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::har::url::{scheme_prefix, UrlParts};
use crate::models::EntryView;

/// Target diagram language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramSyntax {
    #[default]
    Mermaid,
    PlantUml,
}

impl fmt::Display for DiagramSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagramSyntax::Mermaid => "mermaid",
            DiagramSyntax::PlantUml => "plantuml",
        })
    }
}

/// Failure while assembling a note; rendered as an error-marker note instead
#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("entry {url} has no host to place a note over")]
    NoParticipant { url: String },
    #[error("failed to format diagram text: {0}")]
    Format(#[from] fmt::Error),
}

/// Arrow shape for a response, picked from the status range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseArrow {
    Solid,
    /// 3xx
    Redirect,
    /// 4xx and 5xx
    Failure,
}

impl ResponseArrow {
    pub fn for_status(status: u16) -> Self {
        match status {
            300..=399 => ResponseArrow::Redirect,
            400..=599 => ResponseArrow::Failure,
            _ => ResponseArrow::Solid,
        }
    }
}

/// Render a whole diagram for `entries`
pub fn render_diagram(entries: &[EntryView], options: &DiagramOptions, syntax: DiagramSyntax) -> String {
    tracing::debug!(entries = entries.len(), %syntax, "rendering sequence diagram");
    match syntax {
        DiagramSyntax::Mermaid => mermaid::render(entries, options),
        DiagramSyntax::PlantUml => plantuml::render(entries, options),
    }
}

/// Use the note if it was built, otherwise log and fall back to `marker`
pub(crate) fn note_or_marker(
    note: Result<String, DiagramError>,
    what: &str,
    entry: &EntryView,
    marker: impl FnOnce() -> String,
) -> String {
    match note {
        Ok(note) => note,
        Err(e) => {
            tracing::error!(error = %e, domain = %entry.domain, url = %entry.url, "failed to build {what} note");
            marker()
        }
    }
}

/// Participant a note is attached to. URLs without a host (`data:`, `blob:`)
/// have no lifeline to put it on.
pub(crate) fn note_participant(entry: &EntryView) -> Result<&str, DiagramError> {
    if entry.domain.is_empty() {
        return Err(DiagramError::NoParticipant {
            url: entry.url.clone(),
        });
    }
    Ok(&entry.domain)
}

/// Participant for an error-marker note
pub(crate) fn marker_participant(entry: &EntryView) -> &str {
    if entry.domain.is_empty() {
        "unknown"
    } else {
        &entry.domain
    }
}

/// Scheme shown on request arrows: parsed from the URL, else its leading
/// `scheme:`, else `unknown`
pub(crate) fn request_scheme(url: &str) -> String {
    if let Some(parts) = UrlParts::parse(url) {
        return parts.scheme;
    }
    tracing::warn!(url, "could not parse URL to extract scheme");
    scheme_prefix(url).unwrap_or("unknown").to_string()
}

/// `Sec-Fetch-Mode` request header, or `n/a`
pub(crate) fn fetch_mode(entry: &EntryView) -> &str {
    entry
        .request_header("sec-fetch-mode")
        .filter(|mode| !mode.is_empty())
        .unwrap_or("n/a")
}

/// Raw content length as shown in `{len}bytes`
pub(crate) fn raw_length(length: Option<i64>) -> String {
    length.map_or_else(|| "-".to_string(), |len| len.to_string())
}
