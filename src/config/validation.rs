//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thread stack sizes, names)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::EngineConfig;

/// Smallest stack the timer thread is allowed to run on.
pub const MIN_STACK_SIZE_KIB: usize = 16;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("timer.thread_name must not be empty")]
    EmptyThreadName,

    #[error("timer.thread_name must not contain NUL bytes")]
    ThreadNameContainsNul,

    #[error("timer.stack_size_kib must be at least {min} (got {actual})")]
    StackTooSmall { min: usize, actual: usize },

    #[error("observability.log_filter must not be empty")]
    EmptyLogFilter,
}

/// Check every semantic rule, collecting all failures.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let name = &config.timer.thread_name;
    if name.trim().is_empty() {
        errors.push(ValidationError::EmptyThreadName);
    }
    if name.contains('\0') {
        errors.push(ValidationError::ThreadNameContainsNul);
    }

    if let Some(kib) = config.timer.stack_size_kib {
        if kib < MIN_STACK_SIZE_KIB {
            errors.push(ValidationError::StackTooSmall {
                min: MIN_STACK_SIZE_KIB,
                actual: kib,
            });
        }
    }

    if config.observability.log_filter.trim().is_empty() {
        errors.push(ValidationError::EmptyLogFilter);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = EngineConfig::default();
        config.timer.thread_name = "  ".into();
        config.timer.stack_size_kib = Some(4);
        config.observability.log_filter = String::new();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyThreadName,
                ValidationError::StackTooSmall { min: 16, actual: 4 },
                ValidationError::EmptyLogFilter,
            ]
        );
    }

    #[test]
    fn test_nul_in_thread_name() {
        let mut config = EngineConfig::default();
        config.timer.thread_name = "timer\0".into();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::ThreadNameContainsNul])
        );
    }
}
