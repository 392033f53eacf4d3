//! The mailer handed to notification handlers.

use std::sync::Arc;
use tracing::debug;

use crate::{Address, Email, Result, SmtpConfig, SmtpTransport, Transport};

/// Sends messages through a shared transport, filling in the default
/// sender.
#[derive(Clone)]
pub struct Mailer {
    transport: Arc<dyn Transport>,
    default_from: Option<Address>,
}

impl Mailer {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            default_from: None,
        }
    }

    /// Mailer delivering over SMTP.
    pub fn smtp(config: SmtpConfig) -> Result<Self> {
        Ok(Self::new(SmtpTransport::new(config)?))
    }

    /// Sender used for messages that don't name one.
    pub fn default_from(mut self, from: &str) -> Result<Self> {
        self.default_from = Some(Address::parse(from)?);
        Ok(self)
    }

    pub fn sender(&self) -> Option<&Address> {
        self.default_from.as_ref()
    }

    pub async fn send(&self, mut email: Email) -> Result<()> {
        if email.from.is_none() {
            email.from = self.default_from.clone();
        }
        self.transport.send(&email).await?;

        debug!(
            to = %email.to.iter().map(Address::to_string).collect::<Vec<_>>().join(", "),
            subject = email.subject.as_deref().unwrap_or_default(),
            "Mail sent"
        );
        Ok(())
    }
}
