//! Ledger records and configuration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::provider::ProviderCategory;

/// One completed, billed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub cost: f64,
    pub provider_id: String,
    pub category: ProviderCategory,
    /// Served by the cheapest provider available at the time
    pub was_optimal: bool,
    /// Saved against the most expensive available provider
    pub savings: f64,
}

/// Ledger sizing and budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Spending budget in USD
    pub budget: f64,
    /// Maximum retained entries
    pub history_limit: usize,
    /// Trailing entries used for optimization metrics
    pub metrics_window: usize,
    /// Fraction of the budget at which the status becomes `Warning`
    pub warning_ratio: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            budget: 100.0,
            history_limit: 1000,
            metrics_window: 100,
            warning_ratio: 0.8,
        }
    }
}

impl LedgerConfig {
    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }

    pub fn with_metrics_window(mut self, metrics_window: usize) -> Self {
        self.metrics_window = metrics_window;
        self
    }
}
