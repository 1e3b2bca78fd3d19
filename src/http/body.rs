//! Body rendering for log entries.

use serde::de::IgnoredAny;

/// Render a captured body for logging.
///
/// Valid JSON has insignificant whitespace removed; everything else
/// (plain text, malformed JSON, binary) is returned as lossy UTF-8.
pub fn compact_body(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    let text = String::from_utf8_lossy(bytes);
    compact_json(&text).unwrap_or_else(|| text.into_owned())
}

/// Strip whitespace outside string literals. `None` if `data` is not valid JSON.
///
/// Token order and number spelling are preserved exactly.
pub fn compact_json(data: &str) -> Option<String> {
    serde_json::from_str::<IgnoredAny>(data).ok()?;

    let mut out = String::with_capacity(data.len());
    let mut in_string = false;
    let mut escaped = false;
    for c in data.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if !matches!(c, ' ' | '\t' | '\n' | '\r') {
            out.push(c);
        }
    }
    Some(out)
}
