//! Point-in-time view of spending

use serde::{Deserialize, Serialize};

use crate::domain::EngineError;

/// Budget state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    WithinBudget,
    /// Spending passed the warning ratio
    Warning,
    Exceeded,
}

impl BudgetStatus {
    pub fn evaluate(spent: f64, budget: f64, warning_ratio: f64) -> Self {
        if budget <= 0.0 {
            return if spent > 0.0 {
                Self::Exceeded
            } else {
                Self::WithinBudget
            };
        }

        let ratio = spent / budget;
        if ratio > 1.0 {
            Self::Exceeded
        } else if ratio >= warning_ratio {
            Self::Warning
        } else {
            Self::WithinBudget
        }
    }
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WithinBudget => write!(f, "within_budget"),
            Self::Warning => write!(f, "warning"),
            Self::Exceeded => write!(f, "exceeded"),
        }
    }
}

/// Routing quality over the trailing window, each value in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationMetrics {
    /// Fraction of entries that saved money
    pub routing_accuracy: f64,
    /// Fraction served by fast-cheap providers
    pub cheapest_model_usage: f64,
    /// One minus the fraction served by reasoning-specialized providers
    pub expensive_model_avoidance: f64,
    /// total_savings / (total_spent + total_savings)
    pub savings_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSnapshot {
    pub total_spent: f64,
    pub savings_from_routing: f64,
    pub request_count: u64,
    pub cost_per_request: f64,
    pub budget: f64,
    /// Negative once the budget is overspent
    pub budget_remaining: f64,
    /// Trailing 24h spend times 30
    pub monthly_projection: f64,
    pub budget_status: BudgetStatus,
    pub optimization: OptimizationMetrics,
}

impl CostSnapshot {
    /// Advisory budget check for callers that want to stop on overspend
    pub fn check_budget(&self) -> Result<(), EngineError> {
        if self.budget_status == BudgetStatus::Exceeded {
            return Err(EngineError::BudgetExceeded {
                spent: self.total_spent,
                budget: self.budget,
            });
        }
        Ok(())
    }
}
