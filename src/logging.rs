//! Tracing subscriber setup

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&config.level)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match config.format.as_str() {
        "json" => builder.json().with_current_span(true).try_init(),
        _ => builder.with_target(false).try_init(),
    };

    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}

fn default_directives(level: &str) -> String {
    format!("kaze={level},tower_http={level},warn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        for level in ["error", "warn", "info", "debug", "trace"] {
            assert!(EnvFilter::try_new(default_directives(level)).is_ok());
        }
    }
}
