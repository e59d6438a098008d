//! Fallback Executor
//!
//! Dispatches a request to the primary provider and walks the remaining
//! available providers, cheapest first, until one of them answers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::EngineError;
use crate::domain::chat::ChatRequest;
use crate::domain::event::EngineEvent;
use crate::domain::provider::{Provider, ProviderAdapter, ProviderCall, ProviderReply};
use crate::infrastructure::observability::{self, ProviderRequestMetricParams};
use crate::infrastructure::provider::ProviderRegistry;

/// Successful dispatch
#[derive(Debug, Clone)]
pub struct Dispatched {
    /// Provider that produced the reply
    pub provider: Provider,
    pub model: String,
    pub reply: ProviderReply,
    pub response_time: Duration,
    /// Providers tried before the successful one, with their errors
    pub failures: Vec<(String, EngineError)>,
}

impl Dispatched {
    pub fn attempts(&self) -> usize {
        self.failures.len() + 1
    }

    pub fn fell_back(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Error of an exhausted chain, with every failure on the way
#[derive(Debug, Clone)]
pub struct DispatchFailure {
    pub error: EngineError,
    pub failures: Vec<(String, EngineError)>,
}

pub struct FallbackExecutor {
    registry: Arc<ProviderRegistry>,
    adapter: Arc<dyn ProviderAdapter>,
    response_timeout: Duration,
    events: Option<broadcast::Sender<EngineEvent>>,
}

impl std::fmt::Debug for FallbackExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackExecutor")
            .field("adapter", &self.adapter.adapter_name())
            .field("response_timeout", &self.response_timeout)
            .finish()
    }
}

impl FallbackExecutor {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        adapter: Arc<dyn ProviderAdapter>,
        response_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            adapter,
            response_timeout,
            events: None,
        }
    }

    /// Publishes a `ProviderFailed` event for each failed attempt
    pub fn with_events(mut self, events: broadcast::Sender<EngineEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Try order: the primary (when available), then the other available
    /// providers by ascending cost
    pub async fn fallback_chain(&self, primary_id: &str) -> Vec<Provider> {
        let mut available = self.registry.available().await;
        available.sort_by(|a, b| a.cost_per_token.total_cmp(&b.cost_per_token));

        match available.iter().position(|p| p.id == primary_id) {
            Some(pos) => {
                let primary = available.remove(pos);
                available.insert(0, primary);
            }
            None => {
                debug!(provider_id = %primary_id, "Primary provider unavailable, using chain only");
            }
        }

        available
    }

    pub async fn dispatch(
        &self,
        request: &ChatRequest,
        primary_id: &str,
    ) -> Result<Dispatched, DispatchFailure> {
        let chain = self.fallback_chain(primary_id).await;

        if chain.is_empty() {
            return Err(DispatchFailure {
                error: EngineError::NoProviderAvailable,
                failures: Vec::new(),
            });
        }

        let mut failures: Vec<(String, EngineError)> = Vec::new();

        for provider in chain {
            // A model override only makes sense for the provider it was meant for
            let model = match &request.model {
                Some(model) if provider.id == primary_id => model.clone(),
                _ => provider.model.clone(),
            };

            let call = ProviderCall {
                request_id: request.id.clone(),
                provider_id: provider.id.clone(),
                model: model.clone(),
                prompt: request.prompt.clone(),
                context: request.context.clone(),
                temperature: request.temperature,
                max_tokens: request.max_tokens,
                deadline: self.response_timeout,
            };

            let started = Instant::now();
            let outcome = self.attempt(call).await;
            let response_time = started.elapsed();

            match outcome {
                Ok(reply) => {
                    observability::record_provider_request(ProviderRequestMetricParams {
                        provider: &provider.id,
                        duration: response_time,
                        success: true,
                        tokens: u64::from(reply.usage.total_tokens),
                    });

                    if !failures.is_empty() {
                        info!(
                            provider_id = %provider.id,
                            primary_id = %primary_id,
                            attempts = failures.len() + 1,
                            "Request served by fallback provider"
                        );
                    }

                    return Ok(Dispatched {
                        model: reply.model.clone().unwrap_or(model),
                        provider,
                        reply,
                        response_time,
                        failures,
                    });
                }
                Err(e) => {
                    observability::record_provider_request(ProviderRequestMetricParams {
                        provider: &provider.id,
                        duration: response_time,
                        success: false,
                        tokens: 0,
                    });
                    warn!(
                        provider_id = %provider.id,
                        request_id = %request.id,
                        error = %e,
                        "Provider attempt failed"
                    );

                    if let Some(events) = &self.events {
                        // No subscribers is not an error
                        let _ = events.send(EngineEvent::ProviderFailed {
                            provider_id: provider.id.clone(),
                            error: e.to_string(),
                        });
                    }

                    failures.push((provider.id, e));
                }
            }
        }

        let attempts = failures.len();
        let last_error = failures
            .last()
            .map(|(_, e)| e.clone())
            .unwrap_or(EngineError::NoProviderAvailable);

        Err(DispatchFailure {
            error: EngineError::all_providers_failed(attempts, last_error),
            failures,
        })
    }

    async fn attempt(&self, call: ProviderCall) -> Result<ProviderReply, EngineError> {
        let reply = tokio::time::timeout(self.response_timeout, self.adapter.generate(call))
            .await
            .map_err(|_| EngineError::timeout(self.response_timeout))??;

        if reply.content.trim().is_empty() {
            return Err(EngineError::invalid_reply("empty content"));
        }

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::provider::ProviderCategory;
    use crate::infrastructure::provider::{FixtureProviderAdapter, StaticProviderSource};

    fn providers() -> Vec<Provider> {
        vec![
            Provider::new("a", "A", ProviderCategory::ReasoningSpecialized, 0.00001),
            Provider::new("b", "B", ProviderCategory::GeneralPurpose, 0.000005),
            Provider::new("c", "C", ProviderCategory::FastCheap, 0.000001),
            Provider::new("d", "D", ProviderCategory::Local, 0.0).with_availability(false),
        ]
    }

    fn request() -> ChatRequest {
        ChatRequest {
            id: "req-1".to_string(),
            session_id: "s-1".to_string(),
            prompt: "Explain ownership".to_string(),
            context: None,
            timestamp: Utc::now(),
            provider_id: None,
            model: None,
            security_context: None,
            max_tokens: 1000,
            temperature: 0.7,
        }
    }

    async fn executor(
        adapter: Arc<FixtureProviderAdapter>,
        timeout: Duration,
    ) -> FallbackExecutor {
        let registry = Arc::new(ProviderRegistry::new(Arc::new(StaticProviderSource::new(
            providers(),
        ))));
        registry.initialize().await;
        FallbackExecutor::new(registry, adapter, timeout)
    }

    #[tokio::test]
    async fn test_chain_puts_primary_first_then_by_cost() {
        let executor = executor(Arc::new(FixtureProviderAdapter::new()), Duration::from_secs(5)).await;

        let chain: Vec<String> = executor
            .fallback_chain("a")
            .await
            .into_iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(chain, vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn test_primary_success() {
        let adapter = Arc::new(FixtureProviderAdapter::new());
        let executor = executor(adapter.clone(), Duration::from_secs(5)).await;

        let dispatched = executor.dispatch(&request(), "a").await.unwrap();

        assert_eq!(dispatched.provider.id, "a");
        assert_eq!(dispatched.attempts(), 1);
        assert!(!dispatched.fell_back());
        assert_eq!(adapter.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_cheapest_remaining_provider() {
        let adapter = Arc::new(FixtureProviderAdapter::new());
        adapter.fail_provider("a").await;
        let (tx, mut rx) = broadcast::channel(8);
        let executor = executor(adapter.clone(), Duration::from_secs(5))
            .await
            .with_events(tx);

        let dispatched = executor.dispatch(&request(), "a").await.unwrap();

        assert_eq!(dispatched.provider.id, "c");
        assert_eq!(dispatched.failures.len(), 1);
        assert_eq!(adapter.calls_for("b").await, 0);
        assert!(matches!(
            rx.recv().await.unwrap(),
            EngineEvent::ProviderFailed { provider_id, .. } if provider_id == "a"
        ));
    }

    #[tokio::test]
    async fn test_all_providers_failed() {
        let adapter = Arc::new(FixtureProviderAdapter::new());
        for id in ["a", "b", "c"] {
            adapter.fail_provider(id).await;
        }
        let executor = executor(adapter.clone(), Duration::from_secs(5)).await;

        let failure = executor.dispatch(&request(), "a").await.unwrap_err();

        assert!(matches!(
            failure.error,
            EngineError::AllProvidersFailed { attempts: 3, .. }
        ));
        assert_eq!(failure.failures.len(), 3);
        // No provider is retried within a call
        assert_eq!(adapter.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_empty_chain_is_no_provider_available() {
        let registry = Arc::new(ProviderRegistry::new(Arc::new(StaticProviderSource::new(vec![
            Provider::new("x", "X", ProviderCategory::Local, 0.0).with_availability(false),
        ]))));
        registry.initialize().await;
        let executor = FallbackExecutor::new(
            registry,
            Arc::new(FixtureProviderAdapter::new()),
            Duration::from_secs(5),
        );

        let failure = executor.dispatch(&request(), "x").await.unwrap_err();

        assert!(matches!(failure.error, EngineError::NoProviderAvailable));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let adapter = Arc::new(FixtureProviderAdapter::new().with_latency(Duration::from_secs(10)));
        let executor = executor(adapter.clone(), Duration::from_secs(1)).await;

        let failure = executor.dispatch(&request(), "a").await.unwrap_err();

        assert!(failure
            .failures
            .iter()
            .all(|(_, e)| matches!(e, EngineError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_model_override_applies_to_primary_only() {
        let adapter = Arc::new(FixtureProviderAdapter::new());
        adapter.fail_provider("a").await;
        let executor = executor(adapter.clone(), Duration::from_secs(5)).await;
        let mut request = request();
        request.model = Some("a-large".to_string());

        let dispatched = executor.dispatch(&request, "a").await.unwrap();

        let calls = adapter.calls().await;
        assert_eq!(calls[0].model, "a-large");
        assert_eq!(calls[1].model, "c");
        assert_eq!(dispatched.model, "c");
    }
}
