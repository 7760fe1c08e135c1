//! Display formatting for durations, sizes, timestamps and long text

use chrono::{DateTime, Utc};

const BYTE_UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Cut `text` to `max_len` characters, appending `...` when anything was dropped
pub fn truncate_text(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Split `text` into consecutive chunks of at most `len` characters
pub fn split_by_length(text: &str, len: usize) -> Vec<String> {
    if len == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(len).map(|chunk| chunk.iter().collect()).collect()
}

/// Human-readable duration from milliseconds: `500ms`, `1.50s`, `1min 30s`, `1h 01min 01s`
pub fn format_time(millis: f64) -> String {
    if millis < 1_000.0 {
        return format!("{}ms", millis.floor() as i64);
    }
    if millis < 60_000.0 {
        return format!("{:.2}s", (millis / 1_000.0).min(59.99));
    }

    let total = millis.floor() as i64;
    let seconds = (total % 60_000) / 1_000;
    if millis < 3_600_000.0 {
        format!("{}min {:02}s", total / 60_000, seconds)
    } else {
        format!(
            "{}h {:02}min {:02}s",
            total / 3_600_000,
            (total % 3_600_000) / 60_000,
            seconds
        )
    }
}

/// Human-readable size with one decimal, or `-` when the size is unknown (`None` or `-1`)
pub fn format_bytes(bytes: Option<i64>) -> String {
    let bytes = match bytes {
        None | Some(-1) => return "-".to_string(),
        Some(0) => return "0 B".to_string(),
        Some(bytes) => bytes,
    };

    let magnitude = bytes.unsigned_abs();
    let mut exponent = 0;
    let mut scaled = magnitude;
    while scaled >= 1_024 && exponent < BYTE_UNITS.len() - 1 {
        scaled /= 1_024;
        exponent += 1;
    }
    let value = magnitude as f64 / 1024_f64.powi(exponent as i32);
    let sign = if bytes < 0 { "-" } else { "" };
    format!("{sign}{value:.1} {}", BYTE_UNITS[exponent])
}

/// `YYYY-MM-DD HH:MM:SS.mmm` in UTC, or without the milliseconds
pub fn format_timestamp(at: &DateTime<Utc>, exclude_millis: bool) -> String {
    if exclude_millis {
        at.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}
