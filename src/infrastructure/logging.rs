use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};

use crate::config::{LogFormat, LoggingConfig};

/// Installs the global subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Output goes to
/// stderr so command output on stdout stays clean.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .try_init()?;
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .try_init()?;
        }
    }

    tracing::debug!(level = %config.level, "Logging initialized");
    Ok(())
}
