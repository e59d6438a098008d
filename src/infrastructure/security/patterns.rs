//! Built-in sensitive-data detectors

use once_cell::sync::Lazy;
use regex::Regex;

/// Extra check applied to each regex match
pub type MatchFilter = fn(&str) -> bool;

/// A named, compiled detector
#[derive(Debug, Clone)]
pub struct DetectorPattern {
    pub name: String,
    pub regex: Regex,
    pub filter: Option<MatchFilter>,
}

impl DetectorPattern {
    pub fn new(name: impl Into<String>, regex: Regex) -> Self {
        Self {
            name: name.into(),
            regex,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: MatchFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Byte offset of the first accepted match
    pub fn find(&self, text: &str) -> Option<usize> {
        self.regex
            .find_iter(text)
            .find(|m| self.filter.is_none_or(|accept| accept(m.as_str())))
            .map(|m| m.start())
    }
}

fn mixes_letters_and_digits(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_alphabetic()) && token.chars().any(|c| c.is_ascii_digit())
}

/// (name, pattern, filter) in evaluation order
const BUILTIN_DETECTORS: &[(&str, &str, Option<MatchFilter>)] = &[
    (
        "credential_assignment",
        r#"(?i)\b(?:api[_-]?key|apikey|secret|token|password|passwd|access[_-]?key)\b\s*[:=]\s*["']?[^\s"']{4,}"#,
        None,
    ),
    ("aws_access_key", r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b", None),
    (
        "private_key_block",
        r"-----BEGIN (?:[A-Z0-9]+ )*PRIVATE KEY-----",
        None,
    ),
    ("bearer_token", r"(?i)\bbearer\s+[A-Za-z0-9\-._~+/]{16,}=*", None),
    ("provider_api_key", r"\b(?:sk|pk|rk)-[A-Za-z0-9_\-]{20,}", None),
    (
        "long_opaque_token",
        r"\b[A-Za-z0-9]{32,}\b",
        Some(mixes_letters_and_digits),
    ),
    ("payment_card", r"\b(?:\d{4}[ -]?){3}\d{4}\b", None),
];

static BUILTIN_PATTERNS: Lazy<Vec<DetectorPattern>> = Lazy::new(|| {
    BUILTIN_DETECTORS
        .iter()
        .map(|&(name, pattern, filter)| {
            let detector = DetectorPattern::new(name, Regex::new(pattern).unwrap());
            match filter {
                Some(f) => detector.with_filter(f),
                None => detector,
            }
        })
        .collect()
});

pub fn builtin_patterns() -> Vec<DetectorPattern> {
    BUILTIN_PATTERNS.clone()
}
