//! Request body normalization for display
//!
//! Binary payloads are replaced by a short label, form and JSON bodies are
//! decoded into parameters, and free text is escaped once so the diagram
//! generators can show it as is.

use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;

use super::url::{decode_uri_component, split_query};
use crate::diagram::escape_freeform;
use crate::models::{NameValue, PostData};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const TEXT_PLAIN: &str = "text/plain";
const APPLICATION_JSON: &str = "application/json";
const UNSUPPORTED_LABEL: &str = "[Unsupported Data Type]";
const BINARY_LABEL: &str = "[Binary Data]";

const BINARY_MIME_PREFIXES: &[&str] = &[
    "application/octet-stream",
    "application/x-protobuf",
    "application/x-msgpack",
    "application/zip",
    "application/x-gzip",
    "application/pdf",
    "image/",
    "audio/",
    "video/",
    "application/x-binary",
];

/// Magic numbers checked against the start of the body, in order
const SIGNATURES: &[(&str, &[&[u8]])] = &[
    ("gzip", &[b"\x1F\x8B"]),
    ("zip", &[b"PK\x03\x04"]),
    ("pdf", &[b"%PDF"]),
    ("png", &[b"\x89PNG"]),
    ("jpeg", &[b"\xFF\xD8\xFF"]),
    ("gif", &[b"GIF87a", b"GIF89a"]),
    ("brotli", &[b"\xCE\xB2\xCF\x81"]),
    ("zstd", &[b"\x28\xB5\x2F\xFD"]),
    ("lzma", &[b"\x5D\x00\x00"]),
];

/// `postData` as captured, before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedPostData {
    pub mime_type: Option<String>,
    pub text: Option<String>,
    /// `base64` when `text` holds encoded bytes
    pub encoding: Option<String>,
    pub params: Option<Vec<NameValue>>,
}

impl CapturedPostData {
    fn is_base64(&self) -> bool {
        self.encoding
            .as_deref()
            .is_some_and(|encoding| encoding.eq_ignore_ascii_case("base64"))
    }

    /// Body bytes used for signature checks. Plain text is projected onto
    /// Latin-1; characters above U+00FF become a byte no check matches.
    fn body_bytes(&self) -> Option<Vec<u8>> {
        let text = self.text.as_deref()?;
        if self.is_base64() {
            if let Ok(bytes) = general_purpose::STANDARD.decode(text) {
                return Some(bytes);
            }
        }
        Some(
            text.chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(0x80))
                .collect(),
        )
    }

    /// Body as text: decoded when base64 holds UTF-8, raw otherwise
    fn body_text(&self) -> Option<String> {
        let text = self.text.as_deref()?;
        if self.is_base64() {
            if let Some(decoded) = general_purpose::STANDARD
                .decode(text)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
            {
                return Some(decoded);
            }
        }
        Some(text.to_string())
    }
}

/// MIME type without parameters, e.g. `text/plain; charset=utf-8` → `text/plain`
pub fn mime_essence(mime_type: Option<&str>) -> String {
    mime_type
        .and_then(|mime| mime.split(';').next())
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

/// Name of the binary format the body starts with, if any
pub fn detect_binary_format(bytes: &[u8]) -> Option<&'static str> {
    let signature = SIGNATURES
        .iter()
        .find(|(_, magics)| magics.iter().any(|magic| bytes.starts_with(magic)))
        .map(|(name, _)| *name);
    if signature.is_some() {
        return signature;
    }

    let has_control = bytes.iter().any(|b| *b <= 0x1F);
    let has_printable = bytes.iter().any(|b| (0x20..=0x7E).contains(b));
    (has_control && !has_printable).then_some("protobuf")
}

/// Normalize a captured body. `None` when the body has no MIME type and is
/// not recognizably binary.
pub fn normalize_post_data(captured: &CapturedPostData) -> Option<PostData> {
    let mime_type = mime_essence(captured.mime_type.as_deref());

    let binary_format = captured
        .body_bytes()
        .and_then(|bytes| detect_binary_format(&bytes));
    let binary_mime = BINARY_MIME_PREFIXES
        .iter()
        .any(|prefix| mime_type.starts_with(prefix));
    if binary_format.is_some() || binary_mime {
        let label = binary_format.map_or_else(
            || BINARY_LABEL.to_string(),
            |format| format!("[{} Data]", format.to_uppercase()),
        );
        return Some(labelled(mime_type, label));
    }

    let text = captured.body_text();
    match mime_type.as_str() {
        FORM_URLENCODED => Some(normalize_form(mime_type, text, captured.params.as_deref())),
        TEXT_PLAIN => Some(PostData {
            text: text.map(|text| escape_freeform(&decode_uri_component(&text).unwrap_or(text))),
            mime_type: Some(mime_type),
            params: None,
        }),
        APPLICATION_JSON => Some(normalize_json(mime_type, text)),
        "" => None,
        _ => Some(labelled(mime_type, UNSUPPORTED_LABEL.to_string())),
    }
}

fn labelled(mime_type: String, label: String) -> PostData {
    PostData {
        mime_type: Some(mime_type),
        text: Some(label),
        params: None,
    }
}

fn normalize_form(mime_type: String, text: Option<String>, params: Option<&[NameValue]>) -> PostData {
    let decoded_text = match text.as_deref() {
        Some(raw) => decode_uri_component(raw).map(Some),
        None => Some(None),
    };
    let decoded_params = match params {
        Some(params) => params
            .iter()
            .map(|param| {
                Some(NameValue::new(
                    decode_uri_component(&param.name)?,
                    escape_freeform(&decode_uri_component(&param.value)?),
                ))
            })
            .collect::<Option<Vec<_>>>(),
        None => Some(text.as_deref().map_or_else(Vec::new, |raw| {
            split_query(raw)
                .into_iter()
                .map(|pair| NameValue::new(pair.name, escape_freeform(&pair.value)))
                .collect()
        })),
    };

    match (decoded_text, decoded_params) {
        (Some(decoded_text), Some(decoded_params)) => PostData {
            mime_type: Some(mime_type),
            text: decoded_text,
            params: Some(decoded_params),
        },
        _ => {
            tracing::warn!("form body is not valid percent-encoding; keeping it raw");
            PostData {
                mime_type: Some(mime_type),
                text,
                params: params.map(<[NameValue]>::to_vec),
            }
        }
    }
}

fn normalize_json(mime_type: String, text: Option<String>) -> PostData {
    let parsed = text.as_deref().and_then(|raw| {
        let decoded = decode_uri_component(raw)?;
        let value = serde_json::from_str::<Value>(&decoded).ok()?;
        Some((decoded, value))
    });

    let Some((decoded, value)) = parsed else {
        tracing::warn!("JSON body could not be decoded; keeping the raw text");
        return PostData {
            mime_type: Some(mime_type),
            text,
            params: None,
        };
    };

    let params = match &value {
        Value::Object(map) => map
            .iter()
            .map(|(name, value)| {
                NameValue::new(
                    decode_uri_component(name).unwrap_or_else(|| name.clone()),
                    escape_freeform(&json_value_text(value)),
                )
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, value)| NameValue::new(index.to_string(), escape_freeform(&json_value_text(value))))
            .collect(),
        _ => Vec::new(),
    };

    PostData {
        mime_type: Some(mime_type),
        text: Some(decoded),
        params: Some(params),
    }
}

/// Strings as their contents, everything else as compact JSON
fn json_value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
