//! Settings for Terra.
//!
//! [`Settings`] is assembled in layers: built-in defaults, then an
//! optional TOML or JSON file, then `TERRA_*` environment variables
//! (`TERRA_MAIL__HOST` sets `mail.host`). A `.env` file in the working
//! directory is read into the environment first.
//!
//! [`ConfigLoader`] is also used on its own to read handler files.

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat, merge_values};
pub use settings::{
    ConditionFailure, ENV_PREFIX, EventSettings, MAX_EXPRESSION_DEPTH, MailBackend, MailSecurity,
    MailSettings, Settings,
};
pub use validation::Validate;
