//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, BackendConfig, BackendMode, ConfigError, ConfigValidationError, EngineConfig,
    LogFormat, LoggingConfig,
};
