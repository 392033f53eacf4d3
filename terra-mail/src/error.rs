//! Mail errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MailError>;

#[derive(Debug, Error)]
pub enum MailError {
    /// The address is not of the form `local@domain.tld`.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// A message was handed to a transport without a required part.
    #[error("Message has no {0}")]
    MissingField(&'static str),

    #[error("Template error: {0}")]
    Template(String),

    /// The transport refused the message for one recipient.
    #[error("Delivery to {recipient} refused: {reason}")]
    Rejected { recipient: String, reason: String },

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        Self::Smtp(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        Self::Smtp(err.to_string())
    }
}

impl From<handlebars::RenderError> for MailError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::Template(err.to_string())
    }
}
