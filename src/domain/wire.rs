//! Versioned payload schemas exchanged with the AI backend
//!
//! Every payload carries a `schema_version`. Replies are validated and
//! converted into domain types here, so core logic never sees raw payloads.

use serde::{Deserialize, Serialize};

use crate::domain::EngineError;
use crate::domain::audit::AuditEntry;
use crate::domain::chat::TokenUsage;
use crate::domain::provider::{Provider, ProviderCall, ProviderReply};

pub const SCHEMA_VERSION: u32 = 1;

fn check_version(kind: &str, version: u32) -> Result<(), EngineError> {
    if version != SCHEMA_VERSION {
        return Err(EngineError::invalid_reply(format!(
            "unsupported {} schema version {} (expected {})",
            kind, version, SCHEMA_VERSION
        )));
    }
    Ok(())
}

/// `POST /v1/generate` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequestV1 {
    pub schema_version: u32,
    pub request_id: String,
    pub provider_id: String,
    pub model: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl From<&ProviderCall> for GenerateRequestV1 {
    fn from(call: &ProviderCall) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            request_id: call.request_id.clone(),
            provider_id: call.provider_id.clone(),
            model: call.model.clone(),
            prompt: call.prompt.clone(),
            context: call.context.clone(),
            temperature: call.temperature,
            max_tokens: call.max_tokens,
            timeout_ms: call.deadline.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageV1 {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
}

fn default_confidence() -> f64 {
    1.0
}

/// `POST /v1/generate` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderReplyV1 {
    pub schema_version: u32,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    pub usage: UsageV1,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

impl ProviderReplyV1 {
    pub fn into_reply(self) -> Result<ProviderReply, EngineError> {
        check_version("reply", self.schema_version)?;

        if self.content.trim().is_empty() {
            return Err(EngineError::invalid_reply("empty content"));
        }

        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(EngineError::invalid_reply(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }

        if let Some(cost) = self.cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(EngineError::invalid_reply(format!("invalid cost {}", cost)));
            }
        }

        let mut usage = TokenUsage::new(self.usage.prompt_tokens, self.usage.completion_tokens);
        if let Some(total) = self.usage.total_tokens {
            usage.total_tokens = total.max(usage.total_tokens);
        }

        Ok(ProviderReply {
            content: self.content,
            model: self.model,
            confidence: self.confidence,
            usage,
            cost: self.cost,
            quality_score: self.quality_score.map(|q| q.clamp(0.0, 1.0)),
        })
    }
}

/// `GET /v1/providers` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderListV1 {
    pub schema_version: u32,
    pub providers: Vec<Provider>,
}

impl ProviderListV1 {
    /// Invalid catalog entries are rejected as a whole
    pub fn into_providers(self) -> Result<Vec<Provider>, EngineError> {
        check_version("provider list", self.schema_version)?;

        for provider in &self.providers {
            provider
                .validate()
                .map_err(|e| EngineError::invalid_reply(e.to_string()))?;
        }

        Ok(self.providers)
    }
}

/// `POST /v1/audit/batches` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditBatchV1 {
    pub schema_version: u32,
    pub entries: Vec<AuditEntry>,
}

impl AuditBatchV1 {
    pub fn new(entries: &[AuditEntry]) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            entries: entries.to_vec(),
        }
    }
}

/// `POST /v1/conversations/export` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequestV1 {
    pub schema_version: u32,
    pub session_id: String,
    /// Serialized conversation
    pub payload: String,
}

/// `POST /v1/conversations/export` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReceiptV1 {
    pub schema_version: u32,
    pub location: String,
}

impl ExportReceiptV1 {
    pub fn into_location(self) -> Result<String, EngineError> {
        check_version("export receipt", self.schema_version)?;

        if self.location.trim().is_empty() {
            return Err(EngineError::invalid_reply("export receipt without location"));
        }

        Ok(self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply_json() -> serde_json::Value {
        json!({
            "schema_version": 1,
            "content": "Lifetimes describe how long references are valid.",
            "confidence": 0.92,
            "usage": { "prompt_tokens": 12, "completion_tokens": 30 }
        })
    }

    #[test]
    fn test_reply_conversion_computes_total() {
        let wire: ProviderReplyV1 = serde_json::from_value(reply_json()).unwrap();
        let reply = wire.into_reply().unwrap();

        assert_eq!(reply.usage.total_tokens, 42);
        assert_eq!(reply.confidence, 0.92);
        assert!(reply.cost.is_none());
    }

    #[test]
    fn test_reply_rejects_unknown_version() {
        let mut value = reply_json();
        value["schema_version"] = json!(2);
        let wire: ProviderReplyV1 = serde_json::from_value(value).unwrap();

        let err = wire.into_reply().unwrap_err();
        assert!(matches!(err, EngineError::InvalidReply { .. }));
    }

    #[test]
    fn test_reply_rejects_confidence_out_of_range() {
        let mut value = reply_json();
        value["confidence"] = json!(1.5);
        let wire: ProviderReplyV1 = serde_json::from_value(value).unwrap();

        assert!(wire.into_reply().is_err());
    }

    #[test]
    fn test_reply_rejects_blank_content() {
        let mut value = reply_json();
        value["content"] = json!("   ");
        let wire: ProviderReplyV1 = serde_json::from_value(value).unwrap();

        assert!(wire.into_reply().is_err());
    }

    #[test]
    fn test_reply_missing_confidence_defaults_to_one() {
        let mut value = reply_json();
        value.as_object_mut().unwrap().remove("confidence");
        let wire: ProviderReplyV1 = serde_json::from_value(value).unwrap();

        assert_eq!(wire.into_reply().unwrap().confidence, 1.0);
    }

    #[test]
    fn test_provider_list_rejects_invalid_provider() {
        let wire: ProviderListV1 = serde_json::from_value(json!({
            "schema_version": 1,
            "providers": [
                { "id": "cheap", "name": "Cheap", "category": "fast_cheap", "cost_per_token": -0.1 }
            ]
        }))
        .unwrap();

        assert!(wire.into_providers().is_err());
    }

    #[test]
    fn test_generate_request_from_call() {
        let call = ProviderCall {
            request_id: "req-1".to_string(),
            provider_id: "gemini".to_string(),
            model: "gemini-flash".to_string(),
            prompt: "hello".to_string(),
            context: None,
            temperature: 0.7,
            max_tokens: 1000,
            deadline: std::time::Duration::from_secs(30),
        };

        let wire = GenerateRequestV1::from(&call);
        assert_eq!(wire.schema_version, SCHEMA_VERSION);
        assert_eq!(wire.timeout_ms, 30_000);

        let json = serde_json::to_value(&wire).unwrap();
        assert!(json.get("context").is_none());
    }
}
