//! Deterministic in-process provider adapter
//!
//! Used by the CLI in offline mode and throughout the tests. Replies are a
//! pure function of the call and failures can be scripted per provider.
//! Calls are counted per provider; only the most recent ones are retained.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::EngineError;
use crate::domain::chat::TokenUsage;
use crate::domain::provider::{ProviderAdapter, ProviderCall, ProviderReply};

const FIXTURE_CONFIDENCE: f64 = 0.9;

/// Number of recent calls kept for inspection
const RECENT_CALL_LIMIT: usize = 64;

#[derive(Debug, Clone)]
enum FailureMode {
    Always,
    /// Fails this many more times, then succeeds
    Times(u32),
}

#[derive(Debug, Default)]
struct FixtureState {
    failures: HashMap<String, FailureMode>,
    replies: HashMap<String, String>,
    total_calls: usize,
    calls_by_provider: HashMap<String, usize>,
    recent_calls: VecDeque<ProviderCall>,
}

impl FixtureState {
    fn record(&mut self, call: &ProviderCall) {
        self.total_calls += 1;
        *self
            .calls_by_provider
            .entry(call.provider_id.clone())
            .or_default() += 1;

        if self.recent_calls.len() == RECENT_CALL_LIMIT {
            self.recent_calls.pop_front();
        }
        self.recent_calls.push_back(call.clone());
    }
}

#[derive(Debug, Default)]
pub struct FixtureProviderAdapter {
    state: Mutex<FixtureState>,
    latency: Option<Duration>,
}

impl FixtureProviderAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated latency applied to every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every call to `provider_id` fails
    pub async fn fail_provider(&self, provider_id: impl Into<String>) {
        self.state
            .lock()
            .await
            .failures
            .insert(provider_id.into(), FailureMode::Always);
    }

    /// The next `times` calls to `provider_id` fail
    pub async fn fail_times(&self, provider_id: impl Into<String>, times: u32) {
        self.state
            .lock()
            .await
            .failures
            .insert(provider_id.into(), FailureMode::Times(times));
    }

    /// Fixed content returned by `provider_id`
    pub async fn with_reply(&self, provider_id: impl Into<String>, content: impl Into<String>) {
        self.state
            .lock()
            .await
            .replies
            .insert(provider_id.into(), content.into());
    }

    pub async fn call_count(&self) -> usize {
        self.state.lock().await.total_calls
    }

    pub async fn calls_for(&self, provider_id: &str) -> usize {
        self.state
            .lock()
            .await
            .calls_by_provider
            .get(provider_id)
            .copied()
            .unwrap_or(0)
    }

    /// Most recent calls, oldest first
    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().await.recent_calls.iter().cloned().collect()
    }
}

/// Rough token estimate of four characters per token
fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() / 4) as u32 + 1
}

#[async_trait]
impl ProviderAdapter for FixtureProviderAdapter {
    async fn generate(&self, call: ProviderCall) -> Result<ProviderReply, EngineError> {
        let scripted = {
            let mut state = self.state.lock().await;
            state.record(&call);

            let should_fail = match state.failures.get_mut(&call.provider_id) {
                Some(FailureMode::Always) => true,
                Some(FailureMode::Times(0)) => false,
                Some(FailureMode::Times(n)) => {
                    *n -= 1;
                    true
                }
                None => false,
            };

            if should_fail {
                return Err(EngineError::provider(
                    &call.provider_id,
                    "scripted fixture failure",
                ));
            }

            state.replies.get(&call.provider_id).cloned()
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let content = scripted.unwrap_or_else(|| {
            format!(
                "[{}:{}] Response to: {}",
                call.provider_id, call.model, call.prompt
            )
        });

        let prompt_tokens = estimate_tokens(&call.prompt)
            + call.context.as_deref().map(estimate_tokens).unwrap_or(0);
        let completion_tokens = estimate_tokens(&content).min(call.max_tokens.max(1));

        Ok(
            ProviderReply::new(content, TokenUsage::new(prompt_tokens, completion_tokens))
                .with_confidence(FIXTURE_CONFIDENCE)
                .with_model(call.model),
        )
    }

    fn adapter_name(&self) -> &'static str {
        "fixture"
    }
}
