use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::cache::TtlPolicy;
use crate::domain::ledger::LedgerConfig;
use crate::domain::provider::Provider;
use crate::domain::rate_limit::RateLimitConfig;
use crate::infrastructure::cache::ResponseCacheConfig;
use crate::infrastructure::services::RoutingServiceConfig;
use crate::infrastructure::session::SessionLimits;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
    pub backend: BackendConfig,
    /// Static provider catalog; the built-in catalog is used when empty
    pub providers: Vec<Provider>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Engine tunables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub requests_per_minute: u32,
    pub cache_enabled: bool,
    pub cache_capacity: usize,
    pub cache_min_content_length: usize,
    pub cache_ttl_short_secs: u64,
    pub cache_ttl_default_secs: u64,
    pub cache_ttl_long_secs: u64,
    /// USD
    pub budget: f64,
    pub budget_warning_ratio: f64,
    pub ledger_history_limit: usize,
    pub metrics_window: usize,
    pub max_turns_per_session: usize,
    pub max_sessions: usize,
    pub audit_batch_size: usize,
    pub response_timeout_ms: u64,
    pub default_temperature: f32,
    pub default_max_tokens: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            cache_enabled: true,
            cache_capacity: 500,
            cache_min_content_length: 10,
            cache_ttl_short_secs: 60,
            cache_ttl_default_secs: 300,
            cache_ttl_long_secs: 900,
            budget: 100.0,
            budget_warning_ratio: 0.8,
            ledger_history_limit: 1000,
            metrics_window: 100,
            max_turns_per_session: 200,
            max_sessions: 1000,
            audit_batch_size: 5,
            response_timeout_ms: 30_000,
            default_temperature: 0.7,
            default_max_tokens: 1000,
        }
    }
}

impl From<&EngineConfig> for RoutingServiceConfig {
    fn from(engine: &EngineConfig) -> Self {
        let ttl = TtlPolicy::new(
            Duration::from_secs(engine.cache_ttl_short_secs),
            Duration::from_secs(engine.cache_ttl_default_secs),
            Duration::from_secs(engine.cache_ttl_long_secs),
        );
        let mut cache = ResponseCacheConfig::default()
            .with_capacity(engine.cache_capacity)
            .with_min_content_length(engine.cache_min_content_length)
            .with_ttl_policy(ttl);
        if !engine.cache_enabled {
            cache = cache.disabled();
        }

        let mut ledger = LedgerConfig::default()
            .with_budget(engine.budget)
            .with_history_limit(engine.ledger_history_limit)
            .with_metrics_window(engine.metrics_window);
        ledger.warning_ratio = engine.budget_warning_ratio;

        Self {
            rate_limit: RateLimitConfig::per_minute(engine.requests_per_minute),
            cache,
            ledger,
            sessions: SessionLimits {
                max_turns_per_session: engine.max_turns_per_session,
                max_sessions: engine.max_sessions,
            },
            audit_batch_size: engine.audit_batch_size,
            response_timeout: Duration::from_millis(engine.response_timeout_ms),
            default_temperature: engine.default_temperature,
            default_max_tokens: engine.default_max_tokens,
            ..Self::default()
        }
    }
}

/// Where providers, audit batches and exports go
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Static catalog and deterministic fixture replies
    #[default]
    Fixture,
    /// Remote backend over HTTP/JSON
    Http,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub mode: BackendMode,
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    /// Directory for exported conversations in fixture mode
    pub export_dir: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::default(),
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            request_timeout_ms: 30_000,
            export_dir: PathBuf::from("exports"),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Rejected configuration values
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("requests_per_minute must be greater than zero")]
    ZeroRateLimit,

    #[error("cache_capacity must be greater than zero when the cache is enabled")]
    ZeroCacheCapacity,

    #[error("budget must be a non-negative number, got {0}")]
    InvalidBudget(f64),

    #[error("budget_warning_ratio must be within (0, 1], got {0}")]
    InvalidWarningRatio(f64),

    #[error("max_turns_per_session must be at least 2 and max_sessions at least 1")]
    InvalidSessionLimits,

    #[error("audit_batch_size must be greater than zero")]
    ZeroAuditBatch,

    #[error("response_timeout_ms must be greater than zero")]
    ZeroResponseTimeout,

    #[error("default_temperature must be within [0, 2], got {0}")]
    InvalidTemperature(f32),

    #[error("backend base_url is required in http mode")]
    MissingBaseUrl,

    #[error("invalid provider '{id}': {reason}")]
    InvalidProvider { id: String, reason: String },

    #[error("duplicate provider id '{0}'")]
    DuplicateProvider(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error(transparent)]
    Invalid(#[from] ConfigValidationError),
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: Self = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let engine = &self.engine;

        if engine.requests_per_minute == 0 {
            return Err(ConfigValidationError::ZeroRateLimit);
        }
        if engine.cache_enabled && engine.cache_capacity == 0 {
            return Err(ConfigValidationError::ZeroCacheCapacity);
        }
        if !engine.budget.is_finite() || engine.budget < 0.0 {
            return Err(ConfigValidationError::InvalidBudget(engine.budget));
        }
        if !(engine.budget_warning_ratio > 0.0 && engine.budget_warning_ratio <= 1.0) {
            return Err(ConfigValidationError::InvalidWarningRatio(
                engine.budget_warning_ratio,
            ));
        }
        if engine.max_turns_per_session < 2 || engine.max_sessions == 0 {
            return Err(ConfigValidationError::InvalidSessionLimits);
        }
        if engine.audit_batch_size == 0 {
            return Err(ConfigValidationError::ZeroAuditBatch);
        }
        if engine.response_timeout_ms == 0 {
            return Err(ConfigValidationError::ZeroResponseTimeout);
        }
        if !(0.0..=2.0).contains(&engine.default_temperature) {
            return Err(ConfigValidationError::InvalidTemperature(
                engine.default_temperature,
            ));
        }
        if self.backend.mode == BackendMode::Http && self.backend.base_url.trim().is_empty() {
            return Err(ConfigValidationError::MissingBaseUrl);
        }

        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            provider
                .validate()
                .map_err(|e| ConfigValidationError::InvalidProvider {
                    id: provider.id.clone(),
                    reason: e.to_string(),
                })?;
            if !seen.insert(provider.id.as_str()) {
                return Err(ConfigValidationError::DuplicateProvider(provider.id.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::provider::ProviderCategory;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.engine.requests_per_minute, 60);
        assert_eq!(config.backend.mode, BackendMode::Fixture);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.engine.requests_per_minute = 0;
        assert_eq!(config.validate(), Err(ConfigValidationError::ZeroRateLimit));

        let mut config = AppConfig::default();
        config.engine.budget_warning_ratio = 1.5;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidWarningRatio(1.5))
        );

        let mut config = AppConfig::default();
        config.engine.max_sessions = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidSessionLimits)
        );

        let mut config = AppConfig::default();
        config.engine.budget = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidBudget(_))
        ));
    }

    #[test]
    fn test_validation_rejects_duplicate_providers() {
        let provider = Provider::new("gpt", "GPT", ProviderCategory::GeneralPurpose, 0.00001);
        let config = AppConfig {
            providers: vec![provider.clone(), provider],
            ..Default::default()
        };

        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::DuplicateProvider("gpt".to_string()))
        );
    }

    #[test]
    fn test_deserialize_partial_config() {
        let raw = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [engine]
                requests_per_minute = 10
                budget = 5.0

                [backend]
                mode = "http"
                base_url = "http://backend:9000"

                [[providers]]
                id = "local"
                name = "Local"
                category = "local"
                cost_per_token = 0.0
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: AppConfig = raw.try_deserialize().unwrap();

        assert_eq!(config.engine.requests_per_minute, 10);
        assert_eq!(config.engine.cache_capacity, 500);
        assert_eq!(config.backend.mode, BackendMode::Http);
        assert_eq!(config.providers.len(), 1);
        assert!(config.providers[0].is_available);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_config_maps_to_service_config() {
        let engine = EngineConfig {
            requests_per_minute: 10,
            cache_enabled: false,
            budget: 5.0,
            response_timeout_ms: 1500,
            max_turns_per_session: 40,
            ..Default::default()
        };

        let service = RoutingServiceConfig::from(&engine);

        assert_eq!(service.rate_limit.requests_per_minute, 10);
        assert!(!service.cache.enabled);
        assert_eq!(service.ledger.budget, 5.0);
        assert_eq!(service.response_timeout, Duration::from_millis(1500));
        assert_eq!(service.sessions.max_turns_per_session, 40);
        assert_eq!(service.sessions.max_sessions, 1000);
    }
}
