//! # Observability
//!
//! Structured logging for the resolver and the CLI. Secret values never reach
//! a log record; only names, categories and backend ids are recorded.

use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use validator::Validate;

use crate::config::ObservabilityConfig;
use crate::secrets::error::{Result, SecretsError};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when set. Installing twice is not an
/// error; the first subscriber stays in place (e.g. in integration tests).
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| SecretsError::config_error(format!("Invalid logging configuration: {}", e)))?;
    let filter = build_filter(&config.log_level)?;

    let installed = if config.json_logging {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder().with_env_filter(filter).with_writer(std::io::stderr).finish(),
        )
    };

    if installed.is_err() {
        // Subscriber already set elsewhere; ignore.
        return Ok(());
    }

    debug!(log_level = %config.log_level, json = config.json_logging, "Logging initialised");
    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(level).map_err(|e| {
        SecretsError::config_error(format!("Invalid log level '{}': {}", level, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_levels_and_directives() {
        let _guard = crate::secrets::test_env_lock();
        std::env::remove_var("RUST_LOG");

        assert!(build_filter("debug").is_ok());
        assert!(build_filter("secretary=trace,warn").is_ok());
        assert!(build_filter("secretary=notalevel").is_err());
    }

    #[test]
    fn test_empty_log_level_rejected() {
        let config = ObservabilityConfig { log_level: String::new(), json_logging: false };
        assert!(init_logging(&config).is_err());
    }
}
