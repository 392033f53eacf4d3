//! Configurable event dispatch for Terra
//!
//! Application code publishes [`Event`]s by action name. Administrators
//! attach handlers to actions through [`EventHandlerConfig`] rows; each
//! row names a handler reference, its settings and a priority. On
//! dispatch the [`EventBus`] builds every configured handler through the
//! [`HandlerCatalog`], evaluates its condition with the sandboxed
//! [`expression`] language and executes it.
//!
//! ## Features
//!
//! - **Registry** - handler rows ordered by priority, loadable from TOML or JSON
//! - **Catalog** - reference strings mapped to constructors, no dynamic loading
//! - **Conditions** - a small expression language with a closed set of functions
//! - **Built-in handlers** - [`SendEmail`] and [`UpdateExpiryDate`]
//! - **Injection** - producers depend on [`EventPublisher`], not on a global
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use terra_events::*;
//! use terra_mail::{Mailer, MemoryTransport};
//!
//! let registry = HandlerRegistry::new();
//! registry.add(
//!     EventHandlerConfig::new("REQUEST_APPROVED", "SendEmail")
//!         .setting("RECIPIENT_EMAILS", "[user_email]")
//!         .setting("SUBJECT_TPL", "Request {{request}} approved"),
//! )?;
//!
//! let mailer = Mailer::new(MemoryTransport::new()).default_from("noreply@terra.local")?;
//! let services = HandlerServices::new(mailer, Arc::new(MemoryStore::new()));
//! let bus = EventBus::new(
//!     Arc::new(registry),
//!     Arc::new(HandlerCatalog::with_builtins(services)),
//! );
//!
//! let report = bus
//!     .send(
//!         Event::new("REQUEST_APPROVED")
//!             .user(UserRef::new("1").with_email("ada@example.com"))
//!             .with("request", 42),
//!     )
//!     .await?;
//! assert_eq!(report.executed, vec!["SendEmail"]);
//! ```

pub mod bus;
pub mod catalog;
pub mod error;
pub mod event;
pub mod expression;
pub mod handler;
pub mod handlers;
pub mod registry;
pub mod store;

pub use bus::{
    DispatchReport, EventBus, EventBusBuilder, EventBusConfig, EventPublisher, HandlerFailure,
};
pub use catalog::{HandlerCatalog, HandlerConstructor, HandlerServices};
pub use error::{
    EventBusError, EventError, ExpressionError, HandlerError, HandlerResolutionError,
    RegistryError, Result, StoreError,
};
pub use event::{Event, InstanceRef, UserRef};
pub use expression::{Evaluator, EvaluatorLimits, Expression, MAX_DEPTH, Value, Variables};
pub use handler::{Handler, HandlerContext};
pub use handlers::{SendEmail, UpdateExpiryDate};
pub use registry::{EventHandlerConfig, HandlerRegistry};
pub use store::{JsonFileStore, MemoryStore, Record, RecordStore};
pub use terra_config::ConditionFailure;

// Re-export commonly used types
pub use async_trait::async_trait;
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
