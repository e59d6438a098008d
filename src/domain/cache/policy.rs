//! Category-dependent TTL policy for cached responses

use std::time::Duration;

use serde::{Deserialize, Serialize};

const COMPLETION_MARKERS: &[&str] = &[
    "autocomplete",
    "complete",
    "completion",
    "suggest",
    "finish this",
    "continue this",
];

const EXPLANATION_MARKERS: &[&str] = &[
    "explain",
    "explanation",
    "document",
    "docstring",
    "describe",
    "what is",
    "what are",
    "how does",
];

/// Caching category of a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptCategory {
    /// Completion/suggestion prompts, stale quickly
    Completion,
    /// Explanation/documentation prompts, stable answers
    Explanation,
    General,
}

/// TTLs per prompt category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub short: Duration,
    pub default: Duration,
    pub long: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(60),
            default: Duration::from_secs(5 * 60),
            long: Duration::from_secs(15 * 60),
        }
    }
}

impl TtlPolicy {
    pub fn new(short: Duration, default: Duration, long: Duration) -> Self {
        Self {
            short,
            default,
            long,
        }
    }

    /// Completion markers win over explanation markers
    pub fn classify(prompt: &str) -> PromptCategory {
        let lowered = prompt.to_lowercase();

        if COMPLETION_MARKERS.iter().any(|m| lowered.contains(m)) {
            PromptCategory::Completion
        } else if EXPLANATION_MARKERS.iter().any(|m| lowered.contains(m)) {
            PromptCategory::Explanation
        } else {
            PromptCategory::General
        }
    }

    pub fn ttl_for_category(&self, category: PromptCategory) -> Duration {
        match category {
            PromptCategory::Completion => self.short,
            PromptCategory::Explanation => self.long,
            PromptCategory::General => self.default,
        }
    }

    pub fn ttl_for(&self, prompt: &str) -> Duration {
        self.ttl_for_category(Self::classify(prompt))
    }
}
