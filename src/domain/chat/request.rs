use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied security metadata attached to a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    /// Flags copied onto every audit entry produced for the request
    #[serde(default)]
    pub compliance_flags: Vec<String>,
}

impl SecurityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    pub fn with_compliance_flag(mut self, flag: impl Into<String>) -> Self {
        self.compliance_flags.push(flag.into());
        self
    }
}

/// Arguments of a `send_message` call
#[derive(Debug, Clone)]
pub struct SendMessage {
    pub session_id: String,
    pub prompt: String,
    pub context: Option<String>,
    pub provider_id: Option<String>,
    pub model: Option<String>,
    pub security_context: Option<SecurityContext>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl SendMessage {
    pub fn new(session_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            prompt: prompt.into(),
            context: None,
            provider_id: None,
            model: None,
            security_context: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Pins the request to a provider, bypassing smart routing
    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_security_context(mut self, security_context: SecurityContext) -> Self {
        self.security_context = Some(security_context);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A request as it flows through the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub id: String,
    pub session_id: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    /// Whether the caller pinned a provider instead of letting the router pick
    pub fn is_pinned(&self) -> bool {
        self.provider_id.is_some()
    }

    pub fn compliance_flags(&self) -> Vec<String> {
        self.security_context
            .as_ref()
            .map(|ctx| ctx.compliance_flags.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_message_builder() {
        let message = SendMessage::new("session-1", "Explain lifetimes")
            .with_context("fn main() {}")
            .with_provider("claude")
            .with_temperature(0.2)
            .with_max_tokens(256)
            .with_security_context(
                SecurityContext::new()
                    .with_principal("dev@example.com")
                    .with_compliance_flag("soc2"),
            );

        assert_eq!(message.session_id, "session-1");
        assert_eq!(message.context.as_deref(), Some("fn main() {}"));
        assert_eq!(message.provider_id.as_deref(), Some("claude"));
        assert_eq!(message.temperature, Some(0.2));
        assert_eq!(message.max_tokens, Some(256));
        assert_eq!(
            message.security_context.unwrap().compliance_flags,
            vec!["soc2".to_string()]
        );
    }
}
