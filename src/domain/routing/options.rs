//! Caller preferences for provider recommendation

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Routing preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingOptions {
    #[serde(default = "default_prefer_cost")]
    pub prefer_cost_optimization: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_quality: Option<f64>,
    /// Maximum USD for a typical exchange
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
    #[serde(default)]
    pub exclude_providers: HashSet<String>,
}

fn default_prefer_cost() -> bool {
    true
}

impl Default for RoutingOptions {
    fn default() -> Self {
        Self {
            prefer_cost_optimization: true,
            minimum_quality: None,
            max_budget: None,
            exclude_providers: HashSet::new(),
        }
    }
}

impl RoutingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cost_optimization(mut self, prefer: bool) -> Self {
        self.prefer_cost_optimization = prefer;
        self
    }

    pub fn with_minimum_quality(mut self, minimum: f64) -> Self {
        self.minimum_quality = Some(minimum);
        self
    }

    pub fn with_max_budget(mut self, max_budget: f64) -> Self {
        self.max_budget = Some(max_budget);
        self
    }

    pub fn exclude(mut self, provider_id: impl Into<String>) -> Self {
        self.exclude_providers.insert(provider_id.into());
        self
    }

    pub fn is_excluded(&self, provider_id: &str) -> bool {
        self.exclude_providers.contains(provider_id)
    }
}
