//! Provider adapter trait - the remote model invocation boundary

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::EngineError;
use crate::domain::chat::TokenUsage;

/// One invocation of one provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCall {
    pub request_id: String,
    pub provider_id: String,
    pub model: String,
    pub prompt: String,
    pub context: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Time the adapter has to produce a reply
    pub deadline: Duration,
}

/// Validated reply of a provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    pub content: String,
    /// Model that served the call, when it differs from the requested one
    pub model: Option<String>,
    pub confidence: f64,
    pub usage: TokenUsage,
    /// Billed cost in USD, when the backend reports one
    pub cost: Option<f64>,
    pub quality_score: Option<f64>,
}

impl ProviderReply {
    pub fn new(content: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            content: content.into(),
            model: None,
            confidence: 1.0,
            usage,
            cost: None,
            quality_score: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Capability to invoke an AI provider
#[async_trait]
pub trait ProviderAdapter: Send + Sync + Debug {
    /// Invokes the provider named in the call
    async fn generate(&self, call: ProviderCall) -> Result<ProviderReply, EngineError>;

    /// Name of the adapter implementation
    fn adapter_name(&self) -> &'static str;
}
