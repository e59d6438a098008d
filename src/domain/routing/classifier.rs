//! Prompt classification used by the routing rules

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prompts longer than this many characters are complex
pub const COMPLEXITY_LENGTH_THRESHOLD: usize = 100;

const CODE_KEYWORDS: &[&str] = &[
    "code", "function", "debug", "implement", "refactor", "class", "method", "variable", "syntax",
];

const CREATIVE_KEYWORDS: &[&str] = &[
    "creative",
    "story",
    "design",
    "write",
    "generate",
    "brainstorm",
    "idea",
];

static MATH_DELIMITERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\$\$.+?\$\$|\\\[.+?\\\]|\\\(.+?\\\)").unwrap());

/// Features of a prompt that drive provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptProfile {
    pub is_complex: bool,
    pub has_code_keywords: bool,
    pub has_creative_keywords: bool,
}

impl PromptProfile {
    pub fn classify(prompt: &str) -> Self {
        let lowered = prompt.to_lowercase();

        let is_complex = prompt.chars().count() > COMPLEXITY_LENGTH_THRESHOLD
            || prompt.contains("```")
            || MATH_DELIMITERS.is_match(prompt);

        Self {
            is_complex,
            has_code_keywords: CODE_KEYWORDS.iter().any(|k| lowered.contains(k)),
            has_creative_keywords: CREATIVE_KEYWORDS.iter().any(|k| lowered.contains(k)),
        }
    }
}

/// Selection rule that produced a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingRule {
    CostOptimized,
    CodeSpecialist,
    CreativeGeneralist,
    ComplexityScore,
    CheapestEligible,
    LastResort,
}

impl fmt::Display for RoutingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CostOptimized => write!(f, "cost_optimized"),
            Self::CodeSpecialist => write!(f, "code_specialist"),
            Self::CreativeGeneralist => write!(f, "creative_generalist"),
            Self::ComplexityScore => write!(f, "complexity_score"),
            Self::CheapestEligible => write!(f, "cheapest_eligible"),
            Self::LastResort => write!(f, "last_resort"),
        }
    }
}

/// Recommended provider together with the reasoning behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub provider_id: String,
    pub rule: RoutingRule,
    pub profile: PromptProfile,
}
