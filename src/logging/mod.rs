//! Logging infrastructure for Vestibule
//!
//! Installs the global tracing subscriber. `RUST_LOG` wins when set;
//! otherwise the configured level applies to this crate and `info` to
//! everything else.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::types::{Result, VestibuleError};

/// Default filter directive for a log level
pub fn default_directive(log_level: &str) -> String {
    format!("vestibule={},info", log_level)
}

/// Install the global subscriber with text or JSON output
pub fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match log_format {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    installed.map_err(|e| VestibuleError::Internal(format!("Failed to initialize tracing: {}", e)))
}
