//! Provider catalog entities

use serde::{Deserialize, Serialize};

use crate::domain::EngineError;

/// Tokens assumed for one prompt/response exchange when estimating cost
pub const ESTIMATED_EXCHANGE_TOKENS: u32 = 1000;

/// Broad class of an AI provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCategory {
    /// Balanced general-purpose models
    GeneralPurpose,
    /// Low latency, low cost models
    FastCheap,
    /// Premium models specialised in multi-step reasoning and code
    ReasoningSpecialized,
    /// Models hosted on the local machine
    Local,
}

impl std::fmt::Display for ProviderCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GeneralPurpose => write!(f, "general_purpose"),
            Self::FastCheap => write!(f, "fast_cheap"),
            Self::ReasoningSpecialized => write!(f, "reasoning_specialized"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Data-handling guarantees offered by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    #[default]
    Standard,
    Enterprise,
}

/// Rate limits published by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRateLimits {
    pub requests_per_minute: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_per_minute: Option<u32>,
}

impl Default for ProviderRateLimits {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            tokens_per_minute: None,
        }
    }
}

fn default_available() -> bool {
    true
}

/// An AI provider endpoint and its routing-relevant attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    /// Default model served by this provider
    #[serde(default)]
    pub model: String,
    pub category: ProviderCategory,
    #[serde(default = "default_available")]
    pub is_available: bool,
    /// USD per token
    pub cost_per_token: f64,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub security_level: SecurityLevel,
    #[serde(default)]
    pub rate_limits: ProviderRateLimits,
    /// Relative answer quality in [0, 1], when the catalog publishes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_rating: Option<f64>,
}

impl Provider {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: ProviderCategory,
        cost_per_token: f64,
    ) -> Self {
        let id = id.into();
        Self {
            model: id.clone(),
            id,
            name: name.into(),
            category,
            is_available: true,
            cost_per_token,
            latency_ms: 0,
            specialties: Vec::new(),
            security_level: SecurityLevel::Standard,
            rate_limits: ProviderRateLimits::default(),
            quality_rating: None,
        }
    }

    /// Single general-purpose provider used when the catalog cannot be loaded
    pub fn fallback() -> Self {
        Self::new(
            "default",
            "Default Assistant",
            ProviderCategory::GeneralPurpose,
            0.000_002,
        )
        .with_model("default")
        .with_specialties(["general"])
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_availability(mut self, is_available: bool) -> Self {
        self.is_available = is_available;
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_specialties<I, S>(mut self, specialties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.specialties = specialties.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = level;
        self
    }

    pub fn with_rate_limits(mut self, rate_limits: ProviderRateLimits) -> Self {
        self.rate_limits = rate_limits;
        self
    }

    pub fn with_quality_rating(mut self, rating: f64) -> Self {
        self.quality_rating = Some(rating);
        self
    }

    pub fn has_specialty(&self, specialty: &str) -> bool {
        self.specialties
            .iter()
            .any(|s| s.eq_ignore_ascii_case(specialty))
    }

    /// Cost of an exchange of `tokens` tokens with this provider
    pub fn estimated_cost(&self, tokens: u32) -> f64 {
        f64::from(tokens) * self.cost_per_token
    }

    /// Whether a typical exchange fits within `max_budget`
    pub fn meets_budget(&self, max_budget: Option<f64>) -> bool {
        max_budget.is_none_or(|budget| self.estimated_cost(ESTIMATED_EXCHANGE_TOKENS) <= budget)
    }

    /// Providers without a published rating are never filtered out
    pub fn meets_quality(&self, minimum: Option<f64>) -> bool {
        match (minimum, self.quality_rating) {
            (Some(min), Some(rating)) => rating >= min,
            _ => true,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.trim().is_empty() {
            return Err(EngineError::configuration("provider id cannot be empty"));
        }

        if !self.cost_per_token.is_finite() || self.cost_per_token < 0.0 {
            return Err(EngineError::configuration(format!(
                "provider '{}' has invalid cost_per_token {}",
                self.id, self.cost_per_token
            )));
        }

        if let Some(rating) = self.quality_rating {
            if !(0.0..=1.0).contains(&rating) {
                return Err(EngineError::configuration(format!(
                    "provider '{}' has quality_rating {} outside [0, 1]",
                    self.id, rating
                )));
            }
        }

        Ok(())
    }
}
