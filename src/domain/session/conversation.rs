//! Conversation sessions and their turns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::chat::ChatResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    /// Provider that produced an assistant turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub cached: bool,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            provider_id: None,
            timestamp,
            cost: 0.0,
            cached: false,
        }
    }

    pub fn assistant(response: &ChatResponse) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: response.content.clone(),
            provider_id: Some(response.provider_id.clone()),
            timestamp: response.timestamp,
            cost: if response.cached { 0.0 } else { response.cost },
            cached: response.cached,
        }
    }
}

/// Ordered exchange between the user and the providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub turns: Vec<ConversationTurn>,
    pub total_cost: f64,
}

impl ConversationSession {
    pub fn new(session_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            created_at,
            turns: Vec::new(),
            total_cost: 0.0,
        }
    }

    /// Appends a completed prompt/response pair
    pub fn record_exchange(&mut self, prompt: &str, asked_at: DateTime<Utc>, response: &ChatResponse) {
        self.turns.push(ConversationTurn::user(prompt, asked_at));

        let reply = ConversationTurn::assistant(response);
        self.total_cost += reply.cost;
        self.turns.push(reply);
    }

    /// Drops the oldest exchanges so at most `max_turns` turns remain
    ///
    /// Turns are removed in user/assistant pairs. `total_cost` still covers
    /// the dropped turns. Returns the number of removed turns.
    pub fn trim_to(&mut self, max_turns: usize) -> usize {
        if self.turns.len() <= max_turns {
            return 0;
        }

        let mut excess = self.turns.len() - max_turns;
        excess += excess % 2;
        let excess = excess.min(self.turns.len());
        self.turns.drain(..excess);
        excess
    }

    /// Time of the latest turn, or creation when there is none
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.turns
            .last()
            .map(|t| t.timestamp)
            .unwrap_or(self.created_at)
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::TokenUsage;

    fn response(cost: f64, cached: bool) -> ChatResponse {
        ChatResponse {
            id: "resp-1".to_string(),
            request_id: "req-1".to_string(),
            provider_id: "gemini".to_string(),
            model: "gemini-flash".to_string(),
            content: "Hi! How can I help you today?".to_string(),
            confidence: 0.9,
            cost,
            response_time_ms: 5,
            timestamp: Utc::now(),
            usage: TokenUsage::new(2, 8),
            quality_score: 0.9,
            cached,
        }
    }

    #[test]
    fn test_record_exchange_keeps_order_and_cost() {
        let mut session = ConversationSession::new("s-1", Utc::now());

        session.record_exchange("hello", Utc::now(), &response(0.002, false));
        session.record_exchange("hello", Utc::now(), &response(0.002, true));

        assert_eq!(session.turns.len(), 4);
        assert_eq!(session.turns[0].role, TurnRole::User);
        assert_eq!(session.turns[1].role, TurnRole::Assistant);
        assert_eq!(session.turns[1].provider_id.as_deref(), Some("gemini"));
        assert!((session.total_cost - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_trim_drops_oldest_exchanges() {
        let mut session = ConversationSession::new("s-1", Utc::now());
        for prompt in ["one", "two", "three"] {
            session.record_exchange(prompt, Utc::now(), &response(0.001, false));
        }

        assert_eq!(session.trim_to(6), 0);
        assert_eq!(session.trim_to(3), 4);
        assert_eq!(session.turns.len(), 2);
        assert_eq!(session.turns[0].content, "three");
        assert_eq!(session.turns[0].role, TurnRole::User);
        assert!((session.total_cost - 0.003).abs() < 1e-12);
    }

    #[test]
    fn test_to_json() {
        let mut session = ConversationSession::new("s-1", Utc::now());
        session.record_exchange("hello", Utc::now(), &response(0.001, false));

        let json = session.to_json().unwrap();
        assert!(json.contains("\"session_id\": \"s-1\""));
        assert!(json.contains("\"role\": \"assistant\""));
    }
}
