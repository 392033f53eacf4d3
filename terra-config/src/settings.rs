// Typed application settings

use crate::loader::{ConfigLoader, merge_values};
use crate::validation::{self, Validate};
use crate::{ConfigError, EnvLoader, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "TERRA";

/// Separator between section and key in environment variable names,
/// e.g. `TERRA_MAIL__HOST`.
pub const ENV_SECTION_SEPARATOR: &str = "__";

/// Highest accepted `events.max_expression_depth`. Deeper limits would let
/// the recursive-descent parser exhaust a 2 MiB worker stack.
pub const MAX_EXPRESSION_DEPTH: usize = 256;

/// Application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mail: MailSettings,
    pub events: EventSettings,
}

/// Which transport delivers outgoing mail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    Smtp,
    /// Write messages to stdout
    #[default]
    Console,
    /// Keep messages in memory
    Memory,
}

/// SMTP connection security.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailSecurity {
    None,
    #[default]
    Starttls,
    Tls,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub backend: MailBackend,
    pub host: String,
    pub port: u16,
    pub security: MailSecurity,
    pub username: Option<String>,
    pub password: Option<String>,
    pub default_from: String,
    pub timeout_secs: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            backend: MailBackend::Console,
            host: "localhost".to_string(),
            port: 587,
            security: MailSecurity::Starttls,
            username: None,
            password: None,
            default_from: "noreply@terra.local".to_string(),
            timeout_secs: 30,
        }
    }
}

/// What the event bus does when a condition cannot be evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionFailure {
    /// Treat the condition as false
    #[default]
    Skip,
    /// Abort the dispatch with an error
    Raise,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// TOML or JSON file holding the handler rows
    pub handlers_file: Option<PathBuf>,
    /// JSON file holding the records handlers may update
    pub records_file: Option<PathBuf>,
    pub continue_on_error: bool,
    pub condition_failure: ConditionFailure,
    pub max_expression_length: usize,
    pub max_expression_depth: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            handlers_file: None,
            records_file: None,
            continue_on_error: false,
            condition_failure: ConditionFailure::Skip,
            max_expression_length: 4096,
            max_expression_depth: 64,
        }
    }
}

impl Settings {
    /// Load settings: `.env` is read into the process environment first,
    /// then defaults, `path` (if any) and `TERRA_*` variables are layered
    /// in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();
        let env = EnvLoader::new(ENV_PREFIX).load();
        Self::load_from(path, env)
    }

    /// Load settings from an optional file and an explicit set of
    /// prefix-stripped, lower-cased environment entries.
    pub fn load_from(path: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let mut tree = serde_json::to_value(Settings::default())
            .map_err(|e| ConfigError::Shape(e.to_string()))?;

        if let Some(path) = path {
            let file = ConfigLoader::auto(path)?.load_file(path)?;
            merge_values(&mut tree, file);
        }

        apply_env(&mut tree, env);

        let settings: Settings = serde_json::from_value(tree)
            .map_err(|e| ConfigError::Shape(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        if self.mail.backend == MailBackend::Smtp {
            validation::non_empty("mail.host", &self.mail.host)?;
            validation::within("mail.port", self.mail.port, 1, u16::MAX)?;
        }
        validation::mailbox("mail.default_from", &self.mail.default_from)?;
        validation::within(
            "events.max_expression_depth",
            self.events.max_expression_depth,
            1,
            MAX_EXPRESSION_DEPTH,
        )?;
        validation::within(
            "events.max_expression_length",
            self.events.max_expression_length,
            1,
            1 << 20,
        )?;
        Ok(())
    }
}

/// Overlay `section__key` environment entries onto the settings tree.
///
/// A value replacing a number or boolean is parsed as JSON so that
/// `TERRA_MAIL__PORT=2525` stays a number; everything else stays a string.
fn apply_env(tree: &mut Value, env: HashMap<String, String>) {
    for (key, raw) in env {
        let Some((section, field)) = key.split_once(ENV_SECTION_SEPARATOR) else {
            continue;
        };
        let Some(section) = tree.get_mut(section).and_then(Value::as_object_mut) else {
            continue;
        };

        let typed = matches!(section.get(field), Some(Value::Number(_) | Value::Bool(_)));
        let value = if typed {
            serde_json::from_str(&raw).unwrap_or(Value::String(raw))
        } else {
            Value::String(raw)
        };
        section.insert(field.to_string(), value);
    }
}
