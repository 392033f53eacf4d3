//! Outgoing messages.

use lettre::message::{MultiPart, header::ContentType};
use serde::{Deserialize, Serialize};

use crate::{Address, MailError, Result};

/// A notification message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Email {
    /// Sender; the mailer's default when unset.
    pub from: Option<Address>,
    pub to: Vec<Address>,
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
}

impl Email {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Add a recipient.
    pub fn to(mut self, to: Address) -> Self {
        self.to.push(to);
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Check the message can be delivered: it needs a sender, at least
    /// one recipient and a body. An empty subject is allowed.
    pub fn validate(&self) -> Result<()> {
        if self.from.is_none() {
            return Err(MailError::MissingField("sender"));
        }
        if self.to.is_empty() {
            return Err(MailError::MissingField("recipient"));
        }
        if self.text.is_none() && self.html.is_none() {
            return Err(MailError::MissingField("body"));
        }
        Ok(())
    }

    pub(crate) fn to_lettre(&self) -> Result<lettre::Message> {
        self.validate()?;

        let mut builder = lettre::Message::builder()
            .subject(self.subject.clone().unwrap_or_default());
        if let Some(from) = &self.from {
            builder = builder.from(from.mailbox()?);
        }
        for to in &self.to {
            builder = builder.to(to.mailbox()?);
        }

        let message = match (&self.text, &self.html) {
            (Some(text), Some(html)) => {
                builder.multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))
            }
            (None, Some(html)) => builder.header(ContentType::TEXT_HTML).body(html.clone()),
            (Some(text), None) => builder.header(ContentType::TEXT_PLAIN).body(text.clone()),
            (None, None) => return Err(MailError::MissingField("body")),
        };
        Ok(message?)
    }
}
