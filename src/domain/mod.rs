//! Domain layer - Core routing entities, policies and collaborator traits

pub mod audit;
pub mod cache;
pub mod chat;
pub mod clock;
pub mod error;
pub mod event;
pub mod ledger;
pub mod provider;
pub mod rate_limit;
pub mod routing;
pub mod security;
pub mod session;
pub mod wire;

pub use audit::{AuditEntry, AuditOperation, AuditOutcome, AuditSink, RiskLevel};
pub use cache::{CacheEntry, CacheKeyGenerator, CacheKeyParams, CacheStats, Sha256KeyGenerator, TtlPolicy};
pub use chat::{ChatRequest, ChatResponse, SecurityContext, SendMessage, TokenUsage};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::EngineError;
pub use event::EngineEvent;
pub use ledger::{BudgetStatus, CostSnapshot, LedgerConfig, LedgerEntry, OptimizationMetrics};
pub use provider::{
    Provider, ProviderAdapter, ProviderCall, ProviderCategory, ProviderReply, ProviderSource,
    SecurityLevel,
};
pub use rate_limit::{RateLimitConfig, RateLimitStatus};
pub use routing::{PromptProfile, RoutingDecision, RoutingOptions, RoutingRule};
pub use security::{SecurityFinding, Validator};
pub use session::{ConversationExporter, ConversationSession, ConversationTurn, TurnRole};
