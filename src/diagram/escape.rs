//! Escaping grammars for diagram text
//!
//! Mermaid labels and free-form text use different grammars and must not be
//! mixed: inline labels go through [`escape_mermaid`], request bodies are
//! normalized once with [`escape_freeform`] when the capture is imported.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::format::truncate_text;

/// An `&` and, when it starts one, the rest of an entity reference
static AMPERSAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&([#A-Za-z0-9]+;)?").expect("Invalid regex pattern"));

/// Escape text for an inline Mermaid label or note.
///
/// Text that already contains `&amp;` is treated as escaped and returned as is.
pub fn escape_mermaid(input: &str) -> String {
    if input.contains("&amp;") {
        return input.to_string();
    }

    let escaped = input.replace('#', "&#35;").replace(':', "&#58;");
    escape_bare_semicolons(&escaped)
        .replace('\\', "")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('{', "&#123;")
        .replace('}', "&#125;")
        .replace('|', "&#124;")
        .replace('\n', "<br>")
}

/// `;` becomes `&#59;` unless it terminates a two or three digit numeric entity
fn escape_bare_semicolons(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c == ';' && !ends_with_numeric_entity_body(&out) {
            out.push_str("&#59;");
        } else {
            out.push(c);
        }
    }
    out
}

fn ends_with_numeric_entity_body(s: &str) -> bool {
    let digits = s.bytes().rev().take_while(|b| b.is_ascii_digit()).count();
    (2..=3).contains(&digits) && s[..s.len() - digits].ends_with("&#")
}

/// Escape free-form text (request bodies) for Mermaid.
///
/// Markdown-significant characters get a backslash, control characters become
/// their two-character escapes, `:` `;` `@` become numeric entities and any
/// `&` that does not start an entity becomes `&amp;`.
pub fn escape_freeform(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 4);
    for c in input.chars() {
        match c {
            '\\' | '$' | '#' | '_' | '~' | '*' | '+' | '=' | '|' | '[' | ']' | '{' | '}' | '('
            | ')' | '>' | '<' | '\'' | '"' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ':' => out.push_str("&#58;"),
            ';' => out.push_str("&#59;"),
            '@' => out.push_str("&#64;"),
            _ => out.push(c),
        }
    }

    AMPERSAND
        .replace_all(&out, |caps: &Captures<'_>| match caps.get(1) {
            Some(_) => caps[0].to_string(),
            None => "&amp;".to_string(),
        })
        .into_owned()
}

/// Escape text for PlantUML: `:` becomes `&#58;` and newlines become a literal `\n`
pub fn escape_plantuml(input: &str) -> String {
    input.replace(':', "&#58;").replace('\n', "\\n")
}

pub fn truncate_and_escape_mermaid(input: &str, max_len: usize) -> String {
    escape_mermaid(&truncate_text(input, max_len))
}

pub fn truncate_and_escape_plantuml(input: &str, max_len: usize) -> String {
    escape_plantuml(&truncate_text(input, max_len))
}
