//! Error types for the Terra CLI.

use std::fmt;
use terra_config::ConfigError;
use terra_events::{EventBusError, EventError, ExpressionError, RegistryError};
use terra_mail::MailError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types.
#[derive(Debug)]
pub enum CliError {
    /// Malformed argument, e.g. a kwargs pair without exactly one colon
    InvalidArgument(String),

    /// Required argument not given on the command line or in kwargs
    MissingArgument(&'static str),

    /// Settings could not be loaded or validated
    Config(String),

    /// Mail transport could not be set up
    Mail(String),

    /// Condition expression failed to parse or evaluate
    Expression(String),

    /// Dispatch was aborted by a handler
    Dispatch(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::MissingArgument(name) => {
                write!(
                    f,
                    "Missing argument: {} (use --{} or --kwargs {}:<value>)",
                    name, name, name
                )
            }
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Mail(msg) => write!(f, "Mail error: {}", msg),
            CliError::Expression(msg) => write!(f, "Expression error: {}", msg),
            CliError::Dispatch(msg) => write!(f, "Dispatch error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<MailError> for CliError {
    fn from(e: MailError) -> Self {
        CliError::Mail(e.to_string())
    }
}

impl From<ExpressionError> for CliError {
    fn from(e: ExpressionError) -> Self {
        CliError::Expression(e.to_string())
    }
}

impl From<RegistryError> for CliError {
    fn from(e: RegistryError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<EventBusError> for CliError {
    fn from(e: EventBusError) -> Self {
        CliError::Dispatch(e.to_string())
    }
}

impl From<EventError> for CliError {
    fn from(e: EventError) -> Self {
        match e {
            EventError::Registry(e) => e.into(),
            EventError::Expression(e) => e.into(),
            EventError::Bus(e) => e.into(),
            other => CliError::Dispatch(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_pick_the_matching_variant() {
        let err: CliError = EventError::Expression(ExpressionError::TooDeep(3)).into();
        assert!(matches!(err, CliError::Expression(_)));

        let err: CliError = ConfigError::UnsupportedFormat("ini".into()).into();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_missing_argument_suggests_both_forms() {
        let err = CliError::MissingArgument("action");
        assert_eq!(
            err.to_string(),
            "Missing argument: action (use --action or --kwargs action:<value>)"
        );
    }
}
