//! Logging setup for the gateway daemon.

use std::str::FromStr;

use anyhow::Context;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Base log level when `RUST_LOG` is not set.
    pub level: Level,
    /// Include file and line information.
    pub file_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: Level::INFO, file_info: false }
    }
}

/// Parse a log level from its configuration string.
pub fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    Level::from_str(level).with_context(|| format!("invalid log level: {}", level))
}

/// Install the global subscriber. `RUST_LOG` overrides the configured
/// level.
pub fn setup_logging(config: LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(config.level.into()));

    let subscriber = fmt::Subscriber::builder().with_env_filter(filter);
    if config.file_info {
        subscriber.with_file(true).with_line_number(true).init();
    } else {
        subscriber.init();
    }
    Ok(())
}
