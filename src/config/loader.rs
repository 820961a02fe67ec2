//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading and circuit creation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let config: ServiceConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let config = parse_config(
            r#"
            [admin]
            bind_address = "127.0.0.1:9000"
            api_key = "secret"

            [defaults]
            failure_threshold = 4

            [[circuits]]
            name = "database"
            failure_threshold = 2
            recovery_timeout_ms = 5000
            timeout_ms = 1000
            success_threshold = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.admin.api_key.as_deref(), Some("secret"));
        assert_eq!(config.defaults.failure_threshold, 4);
        assert_eq!(config.defaults.timeout_ms, 30_000);
        assert_eq!(config.circuits[0].success_threshold, 2);
    }

    #[test]
    fn test_invalid_config_reports_validation() {
        let err = parse_config(
            r#"
            [[circuits]]
            name = "broker_api"
            failure_threshold = 0
            recovery_timeout_ms = 1000
            timeout_ms = 1000
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("failure_threshold must be at least 1"));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        assert!(matches!(parse_config("[admin"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
