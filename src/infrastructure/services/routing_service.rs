//! Routing service - the engine facade
//!
//! Owns every engine component and runs a message through them:
//! session claim, security gate, rate limiter, cache lookup, routing,
//! fallback dispatch, ledger, cache insert and audit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::EngineError;
use crate::domain::audit::{AuditEntry, AuditOperation, AuditOutcome, AuditSink, RiskLevel};
use crate::domain::cache::CacheStats;
use crate::domain::chat::{ChatRequest, ChatResponse, SendMessage};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::event::EngineEvent;
use crate::domain::ledger::{CostSnapshot, LedgerConfig};
use crate::domain::provider::{Provider, ProviderAdapter, ProviderSource};
use crate::domain::rate_limit::{RateLimitConfig, RateLimitStatus};
use crate::domain::routing::{RoutingDecision, RoutingOptions};
use crate::domain::security::Validator;
use crate::domain::session::{ConversationExporter, ConversationSession};
use crate::infrastructure::audit::{AuditQueue, DEFAULT_BATCH_SIZE, TracingAuditSink};
use crate::infrastructure::cache::{ResponseCache, ResponseCacheConfig};
use crate::infrastructure::fallback::{Dispatched, FallbackExecutor};
use crate::infrastructure::ledger::CostLedger;
use crate::infrastructure::observability;
use crate::infrastructure::provider::ProviderRegistry;
use crate::infrastructure::rate_limit::SlidingWindowRateLimiter;
use crate::infrastructure::routing::RoutingEngine;
use crate::infrastructure::security::SecurityGate;
use crate::infrastructure::session::{InMemoryConversationExporter, SessionLimits, SessionStore};

/// Tunables of the routing service
#[derive(Debug, Clone)]
pub struct RoutingServiceConfig {
    pub rate_limit: RateLimitConfig,
    pub cache: ResponseCacheConfig,
    pub ledger: LedgerConfig,
    pub sessions: SessionLimits,
    /// Options applied when `send_message` routes automatically
    pub routing: RoutingOptions,
    pub audit_batch_size: usize,
    /// Per-attempt provider deadline
    pub response_timeout: Duration,
    pub default_temperature: f32,
    pub default_max_tokens: u32,
    pub event_capacity: usize,
}

impl Default for RoutingServiceConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            cache: ResponseCacheConfig::default(),
            ledger: LedgerConfig::default(),
            sessions: SessionLimits::default(),
            routing: RoutingOptions::default(),
            audit_batch_size: DEFAULT_BATCH_SIZE,
            response_timeout: Duration::from_secs(30),
            default_temperature: 0.7,
            default_max_tokens: 1000,
            event_capacity: 64,
        }
    }
}

impl RoutingServiceConfig {
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_cache(mut self, cache: ResponseCacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_ledger(mut self, ledger: LedgerConfig) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_session_limits(mut self, sessions: SessionLimits) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_routing(mut self, routing: RoutingOptions) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_audit_batch_size(mut self, audit_batch_size: usize) -> Self {
        self.audit_batch_size = audit_batch_size;
        self
    }

    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }
}

/// Builder wiring the collaborators of a [`RoutingService`]
pub struct RoutingServiceBuilder {
    source: Arc<dyn ProviderSource>,
    adapter: Arc<dyn ProviderAdapter>,
    audit_sink: Arc<dyn AuditSink>,
    exporter: Arc<dyn ConversationExporter>,
    validator: Arc<dyn Validator>,
    clock: Arc<dyn Clock>,
    config: RoutingServiceConfig,
}

impl RoutingServiceBuilder {
    pub fn new(source: Arc<dyn ProviderSource>, adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            source,
            adapter,
            audit_sink: Arc::new(TracingAuditSink),
            exporter: Arc::new(InMemoryConversationExporter::new()),
            validator: Arc::new(SecurityGate::new()),
            clock: Arc::new(SystemClock),
            config: RoutingServiceConfig::default(),
        }
    }

    pub fn with_audit_sink(mut self, audit_sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = audit_sink;
        self
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn ConversationExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: RoutingServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> RoutingService {
        let (events, _) = broadcast::channel(self.config.event_capacity.max(1));
        let registry = Arc::new(ProviderRegistry::new(self.source));

        RoutingService {
            router: RoutingEngine::new(registry.clone()),
            executor: FallbackExecutor::new(
                registry.clone(),
                self.adapter,
                self.config.response_timeout,
            )
            .with_events(events.clone()),
            limiter: SlidingWindowRateLimiter::new(self.config.rate_limit, self.clock.clone()),
            cache: ResponseCache::new(self.config.cache.clone(), self.clock.clone()),
            ledger: CostLedger::new(self.config.ledger, self.clock.clone()),
            audit: AuditQueue::new(self.audit_sink, self.config.audit_batch_size),
            sessions: SessionStore::new(self.clock.clone()).with_limits(self.config.sessions),
            registry,
            validator: self.validator,
            exporter: self.exporter,
            clock: self.clock,
            events,
            config: self.config,
        }
    }
}

pub struct RoutingService {
    config: RoutingServiceConfig,
    clock: Arc<dyn Clock>,
    registry: Arc<ProviderRegistry>,
    router: RoutingEngine,
    executor: FallbackExecutor,
    validator: Arc<dyn Validator>,
    limiter: SlidingWindowRateLimiter,
    cache: ResponseCache,
    ledger: CostLedger,
    audit: AuditQueue,
    sessions: SessionStore,
    exporter: Arc<dyn ConversationExporter>,
    events: broadcast::Sender<EngineEvent>,
}

impl std::fmt::Debug for RoutingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingService")
            .field("config", &self.config)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl RoutingService {
    pub fn builder(
        source: Arc<dyn ProviderSource>,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> RoutingServiceBuilder {
        RoutingServiceBuilder::new(source, adapter)
    }

    pub fn config(&self) -> &RoutingServiceConfig {
        &self.config
    }

    /// Loads the provider catalog
    pub async fn initialize(&self) -> Vec<Provider> {
        let providers = self.registry.initialize().await;
        self.publish(EngineEvent::ProvidersRefreshed {
            available: providers.iter().filter(|p| p.is_available).count(),
            total: providers.len(),
        });
        providers
    }

    /// Re-reads provider availability from the source
    pub async fn refresh_providers(&self) -> Result<usize, EngineError> {
        let changed = self.registry.refresh().await?;
        let providers = self.registry.all().await;
        self.publish(EngineEvent::ProvidersRefreshed {
            available: providers.iter().filter(|p| p.is_available).count(),
            total: providers.len(),
        });
        Ok(changed)
    }

    pub async fn providers(&self) -> Vec<Provider> {
        self.registry.all().await
    }

    pub async fn set_provider_availability(&self, provider_id: &str, is_available: bool) -> bool {
        self.registry.set_availability(provider_id, is_available).await
    }

    pub async fn recommend(&self, prompt: &str, options: &RoutingOptions) -> Option<String> {
        self.router.recommend(prompt, options).await
    }

    pub async fn decide(&self, prompt: &str, options: &RoutingOptions) -> Option<RoutingDecision> {
        self.router.decide(prompt, options).await
    }

    /// Sends a prompt and returns the provider's answer
    ///
    /// Only one message per session may be in flight. Cache hits are
    /// returned with `cached = true` and are not billed.
    pub async fn send_message(&self, message: SendMessage) -> Result<ChatResponse, EngineError> {
        let _in_flight = self.sessions.begin(&message.session_id)?;
        let request = self.build_request(message);

        debug!(
            request_id = %request.id,
            session_id = %request.session_id,
            pinned = request.is_pinned(),
            "Processing message"
        );

        self.check_security(&request).await?;
        self.check_rate_limit(&request).await?;

        let cache_key = self.cache.key_for(&request);
        if let Some(mut hit) = self.cache.get(&cache_key).await {
            hit.request_id = request.id.clone();
            self.sessions
                .record_exchange(&request.session_id, &request.prompt, request.timestamp, &hit)
                .await;
            self.audit_request(&request, &hit, &[]).await;
            info!(
                request_id = %request.id,
                provider_id = %hit.provider_id,
                "Served from cache"
            );
            return Ok(hit);
        }

        let (primary_id, was_smart_routed) = self.route(&request).await?;
        let providers = self.registry.all().await;

        let dispatched = match self.executor.dispatch(&request, &primary_id).await {
            Ok(dispatched) => dispatched,
            Err(failure) => {
                self.audit_provider_failures(&request, &failure.failures).await;
                warn!(
                    request_id = %request.id,
                    error = %failure.error,
                    "Message failed"
                );
                return Err(failure.error);
            }
        };

        let response = self.build_response(&request, &dispatched);

        let outcome = self.ledger.record(&response, &providers, was_smart_routed).await;
        if outcome.crossed_budget {
            self.publish(EngineEvent::BudgetExceeded {
                spent: outcome.total_spent,
                budget: self.config.ledger.budget,
            });
        }

        self.cache.insert(cache_key, &request.prompt, &response).await;
        self.sessions
            .record_exchange(&request.session_id, &request.prompt, request.timestamp, &response)
            .await;
        self.audit_request(&request, &response, &dispatched.failures).await;

        info!(
            request_id = %request.id,
            provider_id = %response.provider_id,
            cost = response.cost,
            response_time_ms = response.response_time_ms,
            attempts = dispatched.attempts(),
            "Message completed"
        );

        Ok(response)
    }

    pub async fn cost_snapshot(&self) -> CostSnapshot {
        self.ledger.snapshot().await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn rate_limit_status(&self) -> RateLimitStatus {
        self.limiter.check().await
    }

    /// Empties the response cache and returns the number of removed entries
    pub async fn clear_cache(&self) -> usize {
        let removed = self.cache.clear().await;
        info!(removed, "Response cache cleared");

        self.audit
            .append(
                AuditEntry::new(
                    AuditOperation::CacheCleared,
                    "response_cache",
                    AuditOutcome::Success,
                    self.clock.now(),
                )
                .with_detail("removed", removed),
            )
            .await;
        self.publish(EngineEvent::CacheCleared { removed });
        removed
    }

    pub async fn reset_ledger(&self) {
        self.ledger.reset().await;

        self.audit
            .append(AuditEntry::new(
                AuditOperation::LedgerReset,
                "cost_ledger",
                AuditOutcome::Success,
                self.clock.now(),
            ))
            .await;
        self.publish(EngineEvent::LedgerReset);
    }

    pub async fn session(&self, session_id: &str) -> Option<ConversationSession> {
        self.sessions.get(session_id).await
    }

    pub async fn clear_session(&self, session_id: &str) -> bool {
        self.sessions.clear(session_id).await
    }

    /// Serializes a session and hands it to the exporter
    ///
    /// Returns where the exporter stored it.
    pub async fn export_conversation(&self, session_id: &str) -> Result<String, EngineError> {
        let session = self
            .sessions
            .get(session_id)
            .await
            .ok_or_else(|| EngineError::session_not_found(session_id))?;

        let serialized = session
            .to_json()
            .map_err(|e| EngineError::internal(format!("cannot serialize session: {}", e)))?;

        let result = self
            .exporter
            .export_conversation(session_id, &serialized)
            .await;

        let outcome = if result.is_ok() {
            AuditOutcome::Success
        } else {
            AuditOutcome::Failure
        };
        self.audit
            .append(
                AuditEntry::new(
                    AuditOperation::ConversationExport,
                    "conversation",
                    outcome,
                    self.clock.now(),
                )
                .with_session(session_id)
                .with_detail("turns", session.turns.len()),
            )
            .await;

        let location = result?;
        info!(session_id = %session_id, location = %location, "Conversation exported");
        Ok(location)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub async fn flush_audit(&self) -> Result<usize, EngineError> {
        self.audit.flush().await
    }

    pub async fn pending_audit(&self) -> usize {
        self.audit.pending().await
    }

    fn build_request(&self, message: SendMessage) -> ChatRequest {
        ChatRequest {
            id: format!("req-{}", Uuid::new_v4()),
            session_id: message.session_id,
            prompt: message.prompt,
            context: message.context,
            timestamp: self.clock.now(),
            provider_id: message.provider_id,
            model: message.model,
            security_context: message.security_context,
            max_tokens: message.max_tokens.unwrap_or(self.config.default_max_tokens),
            temperature: message.temperature.unwrap_or(self.config.default_temperature),
        }
    }

    fn build_response(&self, request: &ChatRequest, dispatched: &Dispatched) -> ChatResponse {
        let reply = &dispatched.reply;
        let cost = reply
            .cost
            .unwrap_or_else(|| dispatched.provider.estimated_cost(reply.usage.total_tokens));

        ChatResponse {
            id: format!("resp-{}", Uuid::new_v4()),
            request_id: request.id.clone(),
            provider_id: dispatched.provider.id.clone(),
            model: dispatched.model.clone(),
            content: reply.content.clone(),
            confidence: reply.confidence.clamp(0.0, 1.0),
            cost: cost.max(0.0),
            response_time_ms: u64::try_from(dispatched.response_time.as_millis()).unwrap_or(u64::MAX),
            timestamp: self.clock.now(),
            usage: reply.usage,
            quality_score: reply.quality_score.unwrap_or(reply.confidence),
            cached: false,
        }
    }

    async fn check_security(&self, request: &ChatRequest) -> Result<(), EngineError> {
        let finding = self.validator.scan(&request.prompt).or_else(|| {
            request
                .context
                .as_deref()
                .and_then(|context| self.validator.scan(context))
        });

        let Some(finding) = finding else {
            return Ok(());
        };

        observability::record_security_rejection(&finding.detector);
        self.audit
            .append(
                AuditEntry::new(
                    AuditOperation::SecurityRejection,
                    "prompt",
                    AuditOutcome::Denied,
                    request.timestamp,
                )
                .with_risk_level(RiskLevel::High)
                .with_session(&request.session_id)
                .with_compliance_flags(request.compliance_flags())
                .with_detail("request_id", &request.id)
                .with_detail("detector", &finding.detector),
            )
            .await;

        warn!(
            request_id = %request.id,
            detector = %finding.detector,
            "Prompt rejected by security gate"
        );
        Err(EngineError::security_violation(finding.detector))
    }

    async fn check_rate_limit(&self, request: &ChatRequest) -> Result<(), EngineError> {
        let status = self.limiter.check_and_record().await;
        if status.allowed {
            return Ok(());
        }

        observability::record_rate_limited();
        self.audit
            .append(
                AuditEntry::new(
                    AuditOperation::RateLimited,
                    "rate_limiter",
                    AuditOutcome::Denied,
                    request.timestamp,
                )
                .with_risk_level(RiskLevel::Medium)
                .with_session(&request.session_id)
                .with_detail("request_id", &request.id)
                .with_detail("reset_in_secs", status.reset_in.as_secs()),
            )
            .await;

        warn!(
            request_id = %request.id,
            limit = status.limit,
            reset_in_secs = status.reset_in.as_secs(),
            "Rate limit exceeded"
        );
        Err(EngineError::rate_limited(status.reset_in))
    }

    /// Primary provider and whether the router chose it
    async fn route(&self, request: &ChatRequest) -> Result<(String, bool), EngineError> {
        if let Some(provider_id) = &request.provider_id {
            if self.registry.get(provider_id).await.is_none() {
                return Err(EngineError::provider_not_found(provider_id));
            }
            return Ok((provider_id.clone(), false));
        }

        let decision = self
            .router
            .decide(&request.prompt, &self.config.routing)
            .await
            .ok_or(EngineError::NoProviderAvailable)?;

        debug!(
            request_id = %request.id,
            provider_id = %decision.provider_id,
            rule = %decision.rule,
            "Provider selected"
        );
        Ok((decision.provider_id, true))
    }

    async fn audit_request(
        &self,
        request: &ChatRequest,
        response: &ChatResponse,
        failures: &[(String, EngineError)],
    ) {
        self.audit_provider_failures(request, failures).await;

        self.audit
            .append(
                AuditEntry::new(
                    AuditOperation::SendMessage,
                    &response.provider_id,
                    AuditOutcome::Success,
                    response.timestamp,
                )
                .with_session(&request.session_id)
                .with_compliance_flags(request.compliance_flags())
                .with_detail("request_id", &request.id)
                .with_detail("cost", response.cost)
                .with_detail("cached", response.cached),
            )
            .await;
    }

    async fn audit_provider_failures(&self, request: &ChatRequest, failures: &[(String, EngineError)]) {
        for (provider_id, error) in failures {
            self.audit
                .append(
                    AuditEntry::new(
                        AuditOperation::ProviderFailure,
                        provider_id,
                        AuditOutcome::Failure,
                        self.clock.now(),
                    )
                    .with_risk_level(RiskLevel::Medium)
                    .with_session(&request.session_id)
                    .with_detail("request_id", &request.id)
                    .with_detail("error", error),
                )
                .await;
        }
    }

    fn publish(&self, event: EngineEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}
