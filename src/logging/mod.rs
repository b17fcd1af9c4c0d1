//! Logging initialization with environment-based formatters
//!
//! - Production: flattened JSON lines for log aggregation
//! - Sandbox: human-readable logs, coloured when stdout is a terminal

use crate::config::get_environment;
use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Initialize logging for the current `ENVIRONMENT`
pub fn init_logging() {
    init_logging_for(&get_environment());
}

/// `RUST_LOG` overrides the default `info` filter. A second call is a no-op.
pub fn init_logging_for(environment: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if is_production(environment) {
        registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_target(true)
                    .with_writer(std::io::stdout),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(std::io::stdout().is_terminal())
                    .with_writer(std::io::stdout),
            )
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("logging already initialized: {}", e);
    }
}

pub fn is_production(environment: &str) -> bool {
    matches!(environment, "production" | "prod")
}
