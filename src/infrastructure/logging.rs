//! Global tracing subscriber setup

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::{LogFormat, LoggingConfig};
use crate::domain::DomainError;

/// Dependencies that are only interesting when something is wrong
const QUIET_TARGETS: &[&str] = &["hyper", "h2", "reqwest", "sqlx"];

/// Filter directives for `level`, keeping chatty dependencies at `warn`
///
/// A target the configured level already mentions is left as configured.
pub fn default_directives(level: &str) -> String {
    let level = level.trim();
    let mut directives = vec![if level.is_empty() { "info" } else { level }.to_string()];

    for target in QUIET_TARGETS {
        let mentioned = level
            .split(',')
            .any(|directive| directive.trim().split('=').next() == Some(*target));
        if !mentioned {
            directives.push(format!("{}=warn", target));
        }
    }

    directives.join(",")
}

fn format_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    }
}

/// Installs the global subscriber. `RUST_LOG`, when set, replaces the
/// configured directives.
pub fn init_logging(config: &LoggingConfig) -> Result<(), DomainError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(&config.level)).map_err(|e| {
            DomainError::configuration(format!("Invalid log level '{}': {}", config.level, e))
        })?,
    };

    tracing_subscriber::registry()
        .with(format_layer(config.format).with_filter(filter))
        .try_init()
        .map_err(|e| DomainError::internal(format!("Logging already initialized: {}", e)))?;

    tracing::info!(level = %config.level, format = ?config.format, "Logging initialized");
    Ok(())
}
