//! String helpers shared by the agents and the normalizer.

pub const NOT_PROVIDED: &str = "(not provided)";
const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// Returns the value, or the `(not provided)` placeholder when absent.
pub fn or_not_provided(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_PROVIDED)
}

/// Truncates `s` to at most `max_chars` characters, appending a marker when
/// anything was cut. Never splits a UTF-8 sequence.
pub fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{TRUNCATION_MARKER}", &s[..byte_idx]),
        None => s.to_string(),
    }
}

/// Short single-line preview used in log messages.
pub fn preview(s: &str, max_chars: usize) -> String {
    let flattened = s.replace(['\n', '\r'], " ");
    match flattened.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &flattened[..byte_idx]),
        None => flattened,
    }
}

/// Strips one surrounding Markdown code fence (e.g. ` ```json ... ``` `).
///
/// Text without a leading fence is returned trimmed but otherwise unchanged.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Info string such as `json` or `json-schema` runs to the end of the line
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
