//! Routing Engine
//!
//! Picks the provider for a prompt from the registry's catalog. Selection is
//! a pure function of the catalog, the prompt and the options; see [`select`].

use std::sync::Arc;

use tracing::debug;

use crate::domain::provider::{Provider, ProviderCategory, SecurityLevel};
use crate::domain::routing::{PromptProfile, RoutingDecision, RoutingOptions, RoutingRule};
use crate::infrastructure::provider::{ProviderRegistry, cheapest};

#[derive(Debug)]
pub struct RoutingEngine {
    registry: Arc<ProviderRegistry>,
}

impl RoutingEngine {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Recommended provider id for `prompt`
    pub async fn recommend(&self, prompt: &str, options: &RoutingOptions) -> Option<String> {
        self.decide(prompt, options).await.map(|d| d.provider_id)
    }

    /// Recommendation together with the classification and matching rule
    pub async fn decide(&self, prompt: &str, options: &RoutingOptions) -> Option<RoutingDecision> {
        let providers = self.registry.all().await;
        let decision = select(&providers, prompt, options);

        match &decision {
            Some(d) => debug!(
                provider_id = %d.provider_id,
                rule = %d.rule,
                is_complex = d.profile.is_complex,
                "Routing decision"
            ),
            None => debug!("No provider eligible for routing"),
        }

        decision
    }
}

/// Complexity affinity of a provider
pub fn complexity_score(provider: &Provider) -> u32 {
    let mut score = match provider.category {
        ProviderCategory::ReasoningSpecialized => 3,
        ProviderCategory::GeneralPurpose => 2,
        ProviderCategory::FastCheap | ProviderCategory::Local => 0,
    };

    if provider.has_specialty("reasoning") {
        score += 2;
    }
    if provider.has_specialty("code") {
        score += 1;
    }
    if provider.security_level == SecurityLevel::Enterprise {
        score += 1;
    }

    score
}

/// Applies the routing rules in order; the first one with a candidate wins
pub fn select(providers: &[Provider], prompt: &str, options: &RoutingOptions) -> Option<RoutingDecision> {
    let profile = PromptProfile::classify(prompt);

    let reachable: Vec<&Provider> = providers
        .iter()
        .filter(|p| p.is_available && !options.is_excluded(&p.id))
        .collect();

    let eligible: Vec<&Provider> = reachable
        .iter()
        .copied()
        .filter(|p| p.meets_quality(options.minimum_quality) && p.meets_budget(options.max_budget))
        .collect();

    let cheapest_in = |category: ProviderCategory| {
        cheapest(eligible.iter().copied().filter(|p| p.category == category))
    };

    let choice = if !profile.is_complex && options.prefer_cost_optimization {
        cheapest_in(ProviderCategory::FastCheap)
            .or_else(|| cheapest_in(ProviderCategory::GeneralPurpose))
            .map(|p| (p, RoutingRule::CostOptimized))
    } else {
        None
    };

    let choice = choice.or_else(|| {
        profile
            .has_code_keywords
            .then(|| cheapest_in(ProviderCategory::ReasoningSpecialized))
            .flatten()
            .map(|p| (p, RoutingRule::CodeSpecialist))
    });

    let choice = choice.or_else(|| {
        profile
            .has_creative_keywords
            .then(|| cheapest_in(ProviderCategory::GeneralPurpose))
            .flatten()
            .map(|p| (p, RoutingRule::CreativeGeneralist))
    });

    let choice = choice.or_else(|| {
        profile
            .is_complex
            .then(|| best_for_complexity(&eligible))
            .flatten()
            .map(|p| (p, RoutingRule::ComplexityScore))
    });

    let choice = choice
        .or_else(|| cheapest(eligible.iter().copied()).map(|p| (p, RoutingRule::CheapestEligible)))
        .or_else(|| cheapest(reachable.iter().copied()).map(|p| (p, RoutingRule::LastResort)));

    choice.map(|(provider, rule)| RoutingDecision {
        provider_id: provider.id.clone(),
        rule,
        profile,
    })
}

/// Highest complexity score; ties go to the cheaper provider
fn best_for_complexity<'a>(candidates: &[&'a Provider]) -> Option<&'a Provider> {
    candidates.iter().copied().fold(None, |best: Option<&Provider>, p| match best {
        Some(b) => {
            let (bs, ps) = (complexity_score(b), complexity_score(p));
            if ps > bs || (ps == bs && p.cost_per_token < b.cost_per_token) {
                Some(p)
            } else {
                Some(b)
            }
        }
        None => Some(p),
    })
}
