//! Infrastructure layer - Engine components and external integrations

pub mod audit;
pub mod backend;
pub mod cache;
pub mod fallback;
pub mod ledger;
pub mod logging;
pub mod observability;
pub mod provider;
pub mod rate_limit;
pub mod routing;
pub mod security;
pub mod services;
pub mod session;
