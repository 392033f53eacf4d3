//! # Terra Mail
//!
//! Outgoing notification mail: addresses, messages, transports and
//! inline Handlebars templates.
//!
//! ## Transports
//!
//! - **SMTP**: delivery through `lettre` with STARTTLS or implicit TLS
//! - **Console**: writes the formatted message to stdout
//! - **Memory**: keeps messages in an outbox
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use terra_mail::{Address, Email, Mailer, MemoryTransport};
//!
//! let outbox = MemoryTransport::new();
//! let mailer = Mailer::new(outbox.clone()).default_from("noreply@terra.local")?;
//!
//! mailer
//!     .send(
//!         Email::new()
//!             .to(Address::parse("owner@example.com")?)
//!             .subject("Your request was approved")
//!             .text("Request #42 is now active."),
//!     )
//!     .await?;
//!
//! assert_eq!(outbox.len(), 1);
//! ```

mod address;
mod error;
mod mailer;
mod message;
mod template;
mod transport;

pub use address::Address;
pub use error::{MailError, Result};
pub use mailer::Mailer;
pub use message::Email;
pub use template::HandlebarsEngine;
pub use transport::{
    ConsoleTransport, MemoryTransport, SmtpConfig, SmtpSecurity, SmtpTransport, Transport,
};
