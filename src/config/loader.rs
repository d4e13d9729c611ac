//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::EngineConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = parse_config(
            r#"
            [timer]
            thread_name = "watchdog"
            stack_size_kib = 64
            "#,
        )
        .unwrap();

        assert_eq!(config.timer.thread_name, "watchdog");
        assert_eq!(config.timer.stack_size_kib, Some(64));
        assert_eq!(config.observability.log_filter, "frugal_deadline=info");
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[timer\nthread_name = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_message() {
        let err = parse_config("[timer]\nstack_size_kib = 1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: timer.stack_size_kib must be at least 16 (got 1)"
        );
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "frugal_deadline_config_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[observability]\nmetrics_enabled = true\n").unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.observability.metrics_enabled);

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
