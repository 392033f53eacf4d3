//! Mailbox addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{MailError, Result};

/// A mailbox, optionally with a display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub email: String,
    pub name: Option<String>,
}

impl Address {
    pub fn new(email: impl Into<String>) -> Result<Self> {
        let email = email.into().trim().to_string();
        check(&email)?;
        Ok(Self { email, name: None })
    }

    pub fn named(email: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: Some(name.into()),
            ..Self::new(email)?
        })
    }

    /// Parse `ada@example.com` or `Ada Lovelace <ada@example.com>`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let Some((name, rest)) = raw.split_once('<') else {
            return Self::new(raw);
        };
        let Some(email) = rest.strip_suffix('>') else {
            return Err(MailError::InvalidAddress(raw.to_string()));
        };

        match name.trim().trim_matches('"') {
            "" => Self::new(email),
            name => Self::named(email, name),
        }
    }

    pub(crate) fn mailbox(&self) -> Result<lettre::message::Mailbox> {
        let address = self
            .email
            .parse::<lettre::Address>()
            .map_err(|_| MailError::InvalidAddress(self.email.clone()))?;
        Ok(lettre::message::Mailbox::new(self.name.clone(), address))
    }
}

impl FromStr for Address {
    type Err = MailError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => f.write_str(&self.email),
        }
    }
}

fn check(email: &str) -> Result<()> {
    let invalid = || MailError::InvalidAddress(email.to_string());

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}
