//! Delivery backends.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::{Email, MailError, Result};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, email: &Email) -> Result<()>;
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpSecurity {
    None,
    #[default]
    StartTls,
    /// Implicit TLS
    Tls,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub credentials: Option<(String, String)>,
    pub timeout: Duration,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 587,
            security: SmtpSecurity::StartTls,
            credentials: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn security(mut self, security: SmtpSecurity) -> Self {
        self.security = security;
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// SMTP delivery through `lettre`.
pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn new(config: SmtpConfig) -> Result<Self> {
        type Smtp = AsyncSmtpTransport<Tokio1Executor>;

        let builder = match config.security {
            SmtpSecurity::None => Smtp::builder_dangerous(&config.host),
            SmtpSecurity::StartTls => Smtp::starttls_relay(&config.host)?,
            SmtpSecurity::Tls => Smtp::relay(&config.host)?,
        };
        let mut builder = builder.port(config.port).timeout(Some(config.timeout));
        if let Some((username, password)) = config.credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        info!(
            host = %config.host,
            port = config.port,
            security = ?config.security,
            "SMTP transport ready"
        );
        Ok(Self {
            inner: builder.build(),
        })
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        self.inner.send(email.to_lettre()?).await?;
        Ok(())
    }
}

/// Keeps accepted messages in an outbox instead of delivering them.
///
/// Clones share the outbox.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    outbox: Arc<Mutex<Vec<Email>>>,
    refused: Arc<Mutex<HashSet<String>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every message addressed to `email`.
    pub fn reject(&self, email: impl Into<String>) {
        self.refused.lock().insert(email.into());
    }

    /// Accepted messages, oldest first.
    pub fn outbox(&self) -> Vec<Email> {
        self.outbox.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.outbox.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.lock().is_empty()
    }

    pub fn clear(&self) {
        self.outbox.lock().clear();
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        email.validate()?;

        let refused = self.refused.lock();
        if let Some(to) = email.to.iter().find(|to| refused.contains(&to.email)) {
            return Err(MailError::Rejected {
                recipient: to.email.clone(),
                reason: "recipient refused".to_string(),
            });
        }
        drop(refused);

        self.outbox.lock().push(email.clone());
        Ok(())
    }
}

/// Prints the formatted message, for development.
pub struct ConsoleTransport {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleTransport {
    pub fn stdout() -> Self {
        Self::to_writer(std::io::stdout())
    }

    pub fn to_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(&self, email: &Email) -> Result<()> {
        let formatted = email.to_lettre()?.formatted();
        let mut out = self.out.lock();
        out.write_all(&formatted)?;
        writeln!(out, "\n{}", "-".repeat(72))?;
        out.flush()?;
        Ok(())
    }
}
