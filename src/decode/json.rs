//! JSON document decoder with an escaped-JSON fallback.

use serde_json::Value;

use super::ValueDecoder;

/// Decodes string values that hold an embedded JSON document.
///
/// Some dumps double-encode: the stored text is JSON whose quotes arrive
/// backslash-escaped. When a direct parse fails, the decoder retries once
/// after collapsing backslash escape sequences.
pub struct JsonDecoder;

impl ValueDecoder for JsonDecoder {
    fn name(&self) -> &'static str {
        "json"
    }

    fn matches(&self, raw: &str) -> bool {
        raw.starts_with('{') || raw.starts_with('[')
    }

    fn decode(&self, raw: &str) -> Option<Value> {
        serde_json::from_str(raw)
            .ok()
            .or_else(|| serde_json::from_str(&collapse_escapes(raw)).ok())
    }
}

/// Collapse backslash escape sequences left behind by double-encoding.
fn collapse_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
