//! Provider source backed by configuration

use async_trait::async_trait;

use crate::domain::EngineError;
use crate::domain::provider::{
    Provider, ProviderCategory, ProviderRateLimits, ProviderSource, SecurityLevel,
};

/// Serves a fixed catalog
#[derive(Debug, Clone)]
pub struct StaticProviderSource {
    providers: Vec<Provider>,
}

impl StaticProviderSource {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    /// Source serving [`default_catalog`]
    pub fn with_default_catalog() -> Self {
        Self::new(default_catalog())
    }
}

impl Default for StaticProviderSource {
    fn default() -> Self {
        Self::with_default_catalog()
    }
}

#[async_trait]
impl ProviderSource for StaticProviderSource {
    async fn list_providers(&self) -> Result<Vec<Provider>, EngineError> {
        Ok(self.providers.clone())
    }
}

/// Catalog used when the configuration does not list providers
pub fn default_catalog() -> Vec<Provider> {
    vec![
        Provider::new("gemini", "Gemini Flash", ProviderCategory::FastCheap, 0.000_000_4)
            .with_model("gemini-1.5-flash")
            .with_latency_ms(400)
            .with_specialties(["general", "fast"])
            .with_rate_limits(ProviderRateLimits {
                requests_per_minute: 120,
                tokens_per_minute: Some(1_000_000),
            })
            .with_quality_rating(0.75),
        Provider::new("gpt", "GPT-4o", ProviderCategory::GeneralPurpose, 0.000_005)
            .with_model("gpt-4o")
            .with_latency_ms(900)
            .with_specialties(["general", "creative"])
            .with_quality_rating(0.85),
        Provider::new("claude", "Claude Sonnet", ProviderCategory::ReasoningSpecialized, 0.000_01)
            .with_model("claude-3-5-sonnet")
            .with_latency_ms(1200)
            .with_specialties(["reasoning", "code", "analysis"])
            .with_security_level(SecurityLevel::Enterprise)
            .with_quality_rating(0.95),
        Provider::new("llama", "Llama (local)", ProviderCategory::Local, 0.0)
            .with_model("llama3")
            .with_latency_ms(1500)
            .with_specialties(["general"])
            .with_availability(false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_returns_catalog() {
        let source = StaticProviderSource::with_default_catalog();

        let providers = source.list_providers().await.unwrap();

        assert_eq!(providers.len(), 4);
        assert!(providers.iter().all(|p| p.validate().is_ok()));
    }

    #[test]
    fn test_default_catalog_ordering_by_cost() {
        let catalog = default_catalog();
        let gemini = catalog.iter().find(|p| p.id == "gemini").unwrap();
        let claude = catalog.iter().find(|p| p.id == "claude").unwrap();

        assert!(gemini.cost_per_token < claude.cost_per_token);
        assert!(claude.has_specialty("reasoning"));
        assert_eq!(claude.security_level, SecurityLevel::Enterprise);
    }
}
