//! Event dispatch error types.

use terra_config::ConfigError;
use terra_mail::MailError;
use thiserror::Error;
use uuid::Uuid;

/// Result type for event operations.
pub type Result<T> = std::result::Result<T, EventError>;

/// Errors raised while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("syntax error at offset {pos}: {message}")]
    Syntax { pos: usize, message: String },

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("expression is {len} bytes long, the limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
}

/// A handler reference that the catalog cannot build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerResolutionError {
    #[error("unknown handler reference '{0}'")]
    UnknownReference(String),
}

/// Record store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while a handler executes.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("event carries no instance")]
    MissingInstance,

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("template error: {0}")]
    Template(String),

    #[error("expression error: {0}")]
    Expression(#[from] ExpressionError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    #[error("{0}")]
    Other(String),
}

/// Handler registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("handler configuration {0} not found")]
    NotFound(Uuid),

    #[error("handler configuration {0} already registered")]
    Duplicate(Uuid),

    #[error("failed to load handler configurations: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid handler configuration: {0}")]
    Invalid(String),
}

/// Errors surfaced to the caller of a dispatch.
#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("handler '{handler}' failed: {source}")]
    Execution {
        handler: String,
        #[source]
        source: HandlerError,
    },

    #[error("condition of handler '{handler}' failed: {source}")]
    Condition {
        handler: String,
        #[source]
        source: ExpressionError,
    },
}

/// Any error produced by this crate.
#[derive(Debug, Error)]
pub enum EventError {
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Resolution(#[from] HandlerResolutionError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Bus(#[from] EventBusError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
