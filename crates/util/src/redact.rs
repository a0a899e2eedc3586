//! Secret redaction for log lines and published call descriptors.

use actionkit_types::Headers;
use once_cell::sync::Lazy;
use regex::Regex;

pub const REDACTED: &str = "<redacted>";

static SENSITIVE_TEXT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: )([\w\-\.=:/+ ]+)",
        r"(?i)([A-Z0-9_]*?(KEY|TOKEN|SECRET|PASSWORD)=)([^\s&]+)",
        r"(?i)(https?://[^:/\s]+:)([^@\s]+)(@)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static SENSITIVE_HEADER_NAME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)^(authorization|proxy-authorization|cookie|set-cookie|.*(api[-_]?key|token|secret|password).*)$").ok());

/// Replaces secret-looking substrings of `text` with [`REDACTED`], keeping
/// the surrounding key or URL structure intact.
pub fn redact_sensitive(text: &str) -> String {
    SENSITIVE_TEXT_PATTERNS.iter().fold(text.to_owned(), |line, pattern| {
        pattern
            .replace_all(&line, |captures: &regex::Captures| {
                let lead = captures.get(1).map_or("", |group| group.as_str());
                let trail = match captures.get(3) {
                    Some(group) if group.as_str() == "@" => "@",
                    _ => "",
                };
                format!("{lead}{REDACTED}{trail}")
            })
            .into_owned()
    })
}

pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADER_NAME.as_ref().is_some_and(|pattern| pattern.is_match(name))
}

/// Returns a copy of `headers` with credential-bearing values replaced.
pub fn redact_headers(headers: &Headers) -> Headers {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if is_sensitive_header(name) { REDACTED.to_string() } else { value.clone() };
            (name.clone(), value)
        })
        .collect()
}
