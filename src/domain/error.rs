use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the routing engine
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("No provider available")]
    NoProviderAvailable,

    #[error("Provider not found: {provider_id}")]
    ProviderNotFound { provider_id: String },

    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("Security violation: prompt matched detector '{detector}'")]
    SecurityViolation { detector: String },

    #[error("All providers failed after {attempts} attempt(s): {last_error}")]
    AllProvidersFailed {
        attempts: usize,
        #[source]
        last_error: Box<EngineError>,
    },

    #[error("Budget exceeded: spent ${spent:.6} of ${budget:.6}")]
    BudgetExceeded { spent: f64, budget: f64 },

    #[error("Session busy: a message is already in flight for '{session_id}'")]
    SessionBusy { session_id: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Provider call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid provider reply: {message}")]
    InvalidReply { message: String },

    #[error("Audit error: {message}")]
    Audit { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    pub fn provider_not_found(provider_id: impl Into<String>) -> Self {
        Self::ProviderNotFound {
            provider_id: provider_id.into(),
        }
    }

    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::RateLimitExceeded {
            retry_after_secs: retry_after.as_secs().max(1),
        }
    }

    pub fn security_violation(detector: impl Into<String>) -> Self {
        Self::SecurityViolation {
            detector: detector.into(),
        }
    }

    pub fn all_providers_failed(attempts: usize, last_error: EngineError) -> Self {
        Self::AllProvidersFailed {
            attempts,
            last_error: Box::new(last_error),
        }
    }

    pub fn session_busy(session_id: impl Into<String>) -> Self {
        Self::SessionBusy {
            session_id: session_id.into(),
        }
    }

    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn invalid_reply(message: impl Into<String>) -> Self {
        Self::InvalidReply {
            message: message.into(),
        }
    }

    pub fn audit(message: impl Into<String>) -> Self {
        Self::Audit {
            message: message.into(),
        }
    }

    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the caller may retry the same call later
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::RateLimitExceeded { .. }
            | Self::AllProvidersFailed { .. }
            | Self::BudgetExceeded { .. }
            | Self::SessionBusy { .. }
            | Self::Provider { .. }
            | Self::Timeout { .. }
            | Self::Audit { .. }
            | Self::Export { .. } => true,
            Self::NoProviderAvailable
            | Self::ProviderNotFound { .. }
            | Self::SecurityViolation { .. }
            | Self::SessionNotFound { .. }
            | Self::InvalidReply { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => false,
        }
    }

    /// Suggested back-off before retrying, when the error carries one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after_secs } => {
                Some(Duration::from_secs(*retry_after_secs))
            }
            _ => None,
        }
    }
}
