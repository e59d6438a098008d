//! Cost Ledger
//!
//! Running totals of spend and routing savings with a bounded history used
//! for optimization metrics and the monthly projection.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::chat::ChatResponse;
use crate::domain::clock::Clock;
use crate::domain::ledger::{
    BudgetStatus, CostSnapshot, LedgerConfig, LedgerEntry, OptimizationMetrics,
};
use crate::domain::provider::{Provider, ProviderCategory};
use crate::infrastructure::observability;
use crate::infrastructure::provider::{cheapest, most_expensive};

/// Days in the monthly projection
const PROJECTION_DAYS: f64 = 30.0;

#[derive(Debug, Default)]
struct LedgerState {
    total_spent: f64,
    total_savings: f64,
    request_count: u64,
    history: VecDeque<LedgerEntry>,
    /// Status after the last record, to report transitions once
    last_status: Option<BudgetStatus>,
}

/// What a `record` call changed
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub entry: LedgerEntry,
    pub budget_status: BudgetStatus,
    /// Set when this record moved the ledger into `Exceeded`
    pub crossed_budget: bool,
    pub total_spent: f64,
}

#[derive(Debug)]
pub struct CostLedger {
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    state: RwLock<LedgerState>,
}

impl CostLedger {
    pub fn new(config: LedgerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: RwLock::new(LedgerState::default()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Records a completed response
    ///
    /// `providers` is the catalog at dispatch time. Savings are credited only
    /// when the router picked the provider.
    pub async fn record(
        &self,
        response: &ChatResponse,
        providers: &[Provider],
        was_smart_routed: bool,
    ) -> RecordOutcome {
        let available: Vec<&Provider> = providers.iter().filter(|p| p.is_available).collect();

        let category = providers
            .iter()
            .find(|p| p.id == response.provider_id)
            .map(|p| p.category)
            .unwrap_or(ProviderCategory::GeneralPurpose);

        let savings = if was_smart_routed {
            most_expensive(available.iter().copied())
                .map(|p| {
                    let counterfactual = f64::from(response.usage.total_tokens) * p.cost_per_token;
                    (counterfactual - response.cost).max(0.0)
                })
                .unwrap_or(0.0)
        } else {
            0.0
        };

        let was_optimal = cheapest(available.iter().copied())
            .is_some_and(|p| p.id == response.provider_id);

        let entry = LedgerEntry {
            timestamp: self.clock.now(),
            cost: response.cost,
            provider_id: response.provider_id.clone(),
            category,
            was_optimal,
            savings,
        };

        let mut state = self.state.write().await;
        state.total_spent += response.cost;
        state.total_savings += savings;
        state.request_count += 1;
        state.history.push_back(entry.clone());
        while state.history.len() > self.config.history_limit {
            state.history.pop_front();
        }

        let status = BudgetStatus::evaluate(
            state.total_spent,
            self.config.budget,
            self.config.warning_ratio,
        );
        let crossed_budget =
            status == BudgetStatus::Exceeded && state.last_status != Some(BudgetStatus::Exceeded);
        state.last_status = Some(status);

        observability::record_spend(&entry.provider_id, entry.cost, entry.savings);
        observability::record_total_spent(state.total_spent);

        debug!(
            provider_id = %entry.provider_id,
            cost = entry.cost,
            savings = entry.savings,
            total_spent = state.total_spent,
            "Ledger updated"
        );

        if crossed_budget {
            warn!(
                total_spent = state.total_spent,
                budget = self.config.budget,
                "Budget exceeded"
            );
        }

        RecordOutcome {
            entry,
            budget_status: status,
            crossed_budget,
            total_spent: state.total_spent,
        }
    }

    pub async fn snapshot(&self) -> CostSnapshot {
        let now = self.clock.now();
        let state = self.state.read().await;

        let cost_per_request = if state.request_count == 0 {
            0.0
        } else {
            state.total_spent / state.request_count as f64
        };

        let day_ago = now - ChronoDuration::hours(24);
        let last_day: f64 = state
            .history
            .iter()
            .filter(|e| e.timestamp > day_ago)
            .map(|e| e.cost)
            .sum();

        CostSnapshot {
            total_spent: state.total_spent,
            savings_from_routing: state.total_savings,
            request_count: state.request_count,
            cost_per_request,
            budget: self.config.budget,
            budget_remaining: self.config.budget - state.total_spent,
            monthly_projection: last_day * PROJECTION_DAYS,
            budget_status: BudgetStatus::evaluate(
                state.total_spent,
                self.config.budget,
                self.config.warning_ratio,
            ),
            optimization: self.optimization(&state),
        }
    }

    fn optimization(&self, state: &LedgerState) -> OptimizationMetrics {
        let skip = state.history.len().saturating_sub(self.config.metrics_window);
        let window: Vec<&LedgerEntry> = state.history.iter().skip(skip).collect();

        let denominator = state.total_spent + state.total_savings;
        let savings_percentage = if denominator > 0.0 {
            state.total_savings / denominator
        } else {
            0.0
        };

        if window.is_empty() {
            return OptimizationMetrics {
                savings_percentage,
                ..Default::default()
            };
        }

        let n = window.len() as f64;
        let fraction = |pred: &dyn Fn(&LedgerEntry) -> bool| {
            window.iter().filter(|e| pred(**e)).count() as f64 / n
        };

        OptimizationMetrics {
            routing_accuracy: fraction(&|e| e.savings > 0.0),
            cheapest_model_usage: fraction(&|e| e.category == ProviderCategory::FastCheap),
            expensive_model_avoidance: 1.0
                - fraction(&|e| e.category == ProviderCategory::ReasoningSpecialized),
            savings_percentage,
        }
    }

    /// Clears totals and history; the budget is kept
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        *state = LedgerState::default();
        info!(budget = self.config.budget, "Cost ledger reset");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::domain::chat::TokenUsage;
    use crate::domain::clock::ManualClock;

    fn providers() -> Vec<Provider> {
        vec![
            Provider::new("gemini", "Gemini", ProviderCategory::FastCheap, 0.000001),
            Provider::new("gpt", "GPT", ProviderCategory::GeneralPurpose, 0.000005),
            Provider::new("claude", "Claude", ProviderCategory::ReasoningSpecialized, 0.00001),
        ]
    }

    fn response(provider_id: &str, total_tokens: u32, cost: f64) -> ChatResponse {
        ChatResponse {
            id: "resp".to_string(),
            request_id: "req".to_string(),
            provider_id: provider_id.to_string(),
            model: provider_id.to_string(),
            content: "answer content".to_string(),
            confidence: 0.9,
            cost,
            response_time_ms: 1,
            timestamp: Utc::now(),
            usage: TokenUsage::new(total_tokens / 2, total_tokens - total_tokens / 2),
            quality_score: 0.9,
            cached: false,
        }
    }

    fn ledger(config: LedgerConfig) -> (CostLedger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (CostLedger::new(config, clock.clone()), clock)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[tokio::test]
    async fn test_smart_routed_savings() {
        let (ledger, _) = ledger(LedgerConfig::default());

        // 1000 tokens on gemini costs 0.001; on claude it would be 0.01
        let outcome = ledger.record(&response("gemini", 1000, 0.001), &providers(), true).await;

        assert!(approx(outcome.entry.savings, 0.009));
        assert!(outcome.entry.was_optimal);
        let snapshot = ledger.snapshot().await;
        assert!(approx(snapshot.total_spent, 0.001));
        assert!(approx(snapshot.savings_from_routing, 0.009));
        assert!(approx(snapshot.budget_remaining, 100.0 - 0.001));
    }

    #[tokio::test]
    async fn test_pinned_provider_earns_no_savings() {
        let (ledger, _) = ledger(LedgerConfig::default());

        let outcome = ledger.record(&response("gemini", 1000, 0.001), &providers(), false).await;

        assert_eq!(outcome.entry.savings, 0.0);
    }

    #[tokio::test]
    async fn test_savings_never_negative() {
        let (ledger, _) = ledger(LedgerConfig::default());

        let outcome = ledger.record(&response("claude", 1000, 0.5), &providers(), true).await;

        assert_eq!(outcome.entry.savings, 0.0);
        assert!(!outcome.entry.was_optimal);
    }

    #[tokio::test]
    async fn test_totals_and_cost_per_request() {
        let (ledger, _) = ledger(LedgerConfig::default());
        let costs = [0.001, 0.004, 0.01];

        for (provider, cost) in ["gemini", "gpt", "claude"].iter().zip(costs) {
            ledger.record(&response(provider, 1000, cost), &providers(), true).await;
        }

        let snapshot = ledger.snapshot().await;
        assert!(approx(snapshot.total_spent, costs.iter().sum()));
        assert_eq!(snapshot.request_count, 3);
        assert!(approx(snapshot.cost_per_request, 0.015 / 3.0));
    }

    #[tokio::test]
    async fn test_optimization_metrics() {
        let (ledger, _) = ledger(LedgerConfig::default());

        ledger.record(&response("gemini", 1000, 0.001), &providers(), true).await;
        ledger.record(&response("gemini", 1000, 0.001), &providers(), true).await;
        ledger.record(&response("gpt", 1000, 0.005), &providers(), true).await;
        ledger.record(&response("claude", 1000, 0.01), &providers(), true).await;

        let metrics = ledger.snapshot().await.optimization;
        assert!(approx(metrics.routing_accuracy, 0.75));
        assert!(approx(metrics.cheapest_model_usage, 0.5));
        assert!(approx(metrics.expensive_model_avoidance, 0.75));
        // savings 0.009 + 0.009 + 0.005 = 0.023; spent 0.017
        assert!(approx(metrics.savings_percentage, 0.023 / 0.040));
    }

    #[tokio::test]
    async fn test_empty_ledger_snapshot() {
        let (ledger, _) = ledger(LedgerConfig::default());

        let snapshot = ledger.snapshot().await;

        assert_eq!(snapshot.total_spent, 0.0);
        assert_eq!(snapshot.cost_per_request, 0.0);
        assert_eq!(snapshot.optimization, OptimizationMetrics::default());
        assert_eq!(snapshot.budget_status, BudgetStatus::WithinBudget);
    }

    #[tokio::test]
    async fn test_monthly_projection_uses_last_24_hours() {
        let (ledger, clock) = ledger(LedgerConfig::default());

        ledger.record(&response("gpt", 1000, 1.0), &providers(), true).await;
        clock.advance(Duration::from_secs(25 * 3600));
        ledger.record(&response("gpt", 1000, 0.5), &providers(), true).await;

        let snapshot = ledger.snapshot().await;
        assert!(approx(snapshot.monthly_projection, 15.0));
        assert!(approx(snapshot.total_spent, 1.5));
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let (ledger, _) = ledger(LedgerConfig::default().with_history_limit(3));

        for _ in 0..5 {
            ledger.record(&response("gemini", 10, 0.0001), &providers(), true).await;
        }

        assert_eq!(ledger.state.read().await.history.len(), 3);
        assert_eq!(ledger.snapshot().await.request_count, 5);
    }

    #[tokio::test]
    async fn test_budget_crossing_is_reported_once() {
        let (ledger, _) = ledger(LedgerConfig::default().with_budget(1.0));

        let first = ledger.record(&response("gpt", 1000, 0.85), &providers(), true).await;
        assert_eq!(first.budget_status, BudgetStatus::Warning);
        assert!(!first.crossed_budget);

        let second = ledger.record(&response("gpt", 1000, 0.3), &providers(), true).await;
        assert_eq!(second.budget_status, BudgetStatus::Exceeded);
        assert!(second.crossed_budget);

        let third = ledger.record(&response("gpt", 1000, 0.3), &providers(), true).await;
        assert!(!third.crossed_budget);

        let snapshot = ledger.snapshot().await;
        assert!(snapshot.budget_remaining < 0.0);
        assert!(snapshot.check_budget().is_err());
    }

    #[tokio::test]
    async fn test_reset_keeps_budget() {
        let (ledger, _) = ledger(LedgerConfig::default().with_budget(42.0));
        ledger.record(&response("gpt", 1000, 0.5), &providers(), true).await;

        ledger.reset().await;

        let snapshot = ledger.snapshot().await;
        assert_eq!(snapshot.total_spent, 0.0);
        assert_eq!(snapshot.request_count, 0);
        assert_eq!(snapshot.budget, 42.0);
        assert!(ledger.state.read().await.history.is_empty());
    }
}
