use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Response returned to the caller of `send_message`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub request_id: String,
    /// Provider that actually produced the content
    pub provider_id: String,
    pub model: String,
    pub content: String,
    /// In [0, 1]
    pub confidence: f64,
    /// USD
    pub cost: f64,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub usage: TokenUsage,
    pub quality_score: f64,
    /// Served from the response cache
    #[serde(default)]
    pub cached: bool,
}

impl ChatResponse {
    /// Copy of this response marked as served from cache
    pub fn as_cached(&self) -> Self {
        Self {
            cached: true,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_calculation() {
        let usage = TokenUsage::new(10, 20);
        assert_eq!(usage.total_tokens, 30);
    }

    #[test]
    fn test_usage_saturates() {
        let usage = TokenUsage::new(u32::MAX, 5);
        assert_eq!(usage.total_tokens, u32::MAX);
    }
}
