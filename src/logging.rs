use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    // RUST_LOG wins over the configured level.
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global fmt subscriber. Returns false when one was already
/// installed, which is expected when several test binaries share a process.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = build_filter(config);

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice_is_not_an_error() {
        let config = LoggingConfig::default();
        init_logging(&config);
        assert!(!init_logging(&config));
    }

    #[test]
    fn test_invalid_level_falls_back() {
        let config = LoggingConfig {
            format: LogFormat::Json,
            level: "not a [valid directive".to_string(),
        };
        let filter = build_filter(&config);
        assert!(!filter.to_string().is_empty());
    }
}
