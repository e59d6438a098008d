//! AI Routing Engine
//!
//! Routes prompts across multiple AI providers with support for:
//! - Cost-first and complexity-aware provider selection
//! - Response caching with category-dependent TTLs
//! - Sliding-window rate limiting and a security gate for secrets in prompts
//! - Provider fallback, a cost ledger and batched audit logging

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::EngineError;
pub use infrastructure::services::{RoutingService, RoutingServiceBuilder, RoutingServiceConfig};
