//! # Observability
//!
//! Structured logging initialization and the metric names emitted by this
//! crate. Metric export (Prometheus, OTLP, ...) is wired up by the embedding
//! service; this crate only records through the `metrics` facade.

use crate::config::ObservabilityConfig;
use crate::errors::{CredplaneError, Result};
use tracing_subscriber::EnvFilter;

/// Metric names recorded by the loader
pub mod metric {
    /// Counter: definitions that failed to parse, labeled by
    /// `credential_type`
    pub const PARSE_FAILURES: &str = "credentials_parse_failures_total";
    /// Counter: credentials applied to the live repository, labeled by
    /// `credential_type`
    pub const APPLIED: &str = "credentials_applied_total";
}

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG` when set, falling back to the configured level.
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| {
            CredplaneError::config_with_source(
                format!("Invalid log level '{}'", config.log_level),
                Box::new(e),
            )
        })?;
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json_logs {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    result.map_err(|e| {
        CredplaneError::config_with_source("Failed to install tracing subscriber", e)
    })
}
