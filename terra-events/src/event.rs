//! Event definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Reference to the record an event is about.
///
/// Parses from `"model:id"` or a bare `"id"` and displays the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceRef {
    /// Model (table) name, when known.
    pub model: Option<String>,
    /// Primary key.
    pub id: String,
}

impl InstanceRef {
    /// Reference a record of `model` by id.
    pub fn new(model: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            id: id.into(),
        }
    }

    /// Reference a record by id only.
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            model: None,
            id: id.into(),
        }
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{}:{}", model, self.id),
            None => f.write_str(&self.id),
        }
    }
}

impl FromStr for InstanceRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.split_once(':') {
            Some((model, id)) if !model.is_empty() => Self::new(model, id),
            Some((_, id)) => Self::id(id),
            None => Self::id(s),
        })
    }
}

/// The user that triggered an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// User id.
    pub id: String,
    /// Email address, when known.
    pub email: Option<String>,
}

impl UserRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.email.as_deref().unwrap_or(&self.id))
    }
}

impl FromStr for UserRef {
    type Err = std::convert::Infallible;

    /// Strings containing `@` are taken as email addresses and double as
    /// the user id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let user = Self::new(s);
        Ok(if s.contains('@') {
            user.with_email(s)
        } else {
            user
        })
    }
}

/// A published event.
///
/// Events are transient: they live for the duration of one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Timestamp when event was created
    pub timestamp: DateTime<Utc>,

    /// Action name, the key handlers are registered under
    pub action: String,

    /// Identifier of the component that published the event
    pub sender: String,

    /// Record the event is about
    pub instance: Option<InstanceRef>,

    /// User that triggered the event
    pub user: Option<UserRef>,

    /// Free-form keyword arguments
    pub extra: Map<String, JsonValue>,
}

impl Event {
    /// Create a new event for `action`.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action: action.into(),
            sender: String::new(),
            instance: None,
            user: None,
            extra: Map::new(),
        }
    }

    /// Set the sender.
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Set the instance reference.
    pub fn instance(mut self, instance: InstanceRef) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Set the triggering user.
    pub fn user(mut self, user: UserRef) -> Self {
        self.user = Some(user);
        self
    }

    /// Add a keyword argument.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Stringified variable set handed to conditions and templates.
    ///
    /// Keyword arguments come first; the built-in names (`action`,
    /// `sender`, `instance`, `user` and their derived fields) override
    /// extras of the same name.
    pub fn variables(&self) -> BTreeMap<String, String> {
        let mut vars: BTreeMap<String, String> = self
            .extra
            .iter()
            .map(|(key, value)| (key.clone(), stringify(value)))
            .collect();

        vars.insert("action".to_string(), self.action.clone());
        vars.insert("sender".to_string(), self.sender.clone());

        if let Some(instance) = &self.instance {
            vars.insert("instance".to_string(), instance.to_string());
            vars.insert("instance_id".to_string(), instance.id.clone());
            if let Some(model) = &instance.model {
                vars.insert("instance_model".to_string(), model.clone());
            }
        }

        if let Some(user) = &self.user {
            vars.insert("user".to_string(), user.to_string());
            if let Some(email) = &user.email {
                vars.insert("user_email".to_string(), email.clone());
            }
        }

        vars
    }
}

fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
