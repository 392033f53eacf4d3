//! The handler capability.

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

use crate::error::{ExpressionError, HandlerError};
use crate::event::Event;
use crate::expression::{Evaluator, Value, Variables};

/// Setting holding a handler's condition expression.
pub const CONDITION: &str = "CONDITION";

/// Condition used when a handler has none configured.
pub const DEFAULT_CONDITION: &str = "True";

/// Everything a handler is built from: the action, its merged settings
/// and the event being dispatched.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    reference: String,
    settings: Map<String, JsonValue>,
    event: Arc<Event>,
}

impl HandlerContext {
    pub fn new(
        reference: impl Into<String>,
        settings: Map<String, JsonValue>,
        event: Arc<Event>,
    ) -> Self {
        Self {
            reference: reference.into(),
            settings,
            event,
        }
    }

    pub fn action(&self) -> &str {
        &self.event.action
    }

    /// Catalog reference the handler was built from.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn shared_event(&self) -> Arc<Event> {
        Arc::clone(&self.event)
    }

    pub fn settings(&self) -> &Map<String, JsonValue> {
        &self.settings
    }

    pub fn setting(&self, key: &str) -> Option<&JsonValue> {
        self.settings.get(key)
    }

    /// A setting that must be a string when present.
    pub fn setting_str(&self, key: &str) -> Result<Option<&str>, HandlerError> {
        match self.settings.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s)),
            Some(other) => Err(invalid_setting(key, "a string", other)),
        }
    }

    /// A setting that must be an integer when present. Numeric strings
    /// are accepted.
    pub fn setting_i64(&self, key: &str) -> Result<Option<i64>, HandlerError> {
        match self.settings.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Number(n)) if n.is_i64() => Ok(n.as_i64()),
            Some(JsonValue::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| invalid_setting(key, "an integer", &JsonValue::String(s.clone()))),
            Some(other) => Err(invalid_setting(key, "an integer", other)),
        }
    }

    /// Source of the handler's condition.
    pub fn condition_source(&self) -> String {
        match self.settings.get(CONDITION) {
            None | Some(JsonValue::Null) => DEFAULT_CONDITION.to_string(),
            Some(JsonValue::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Settings merged with the event's stringified variables. Event
    /// variables win on clashes; the whole settings map is also exposed
    /// as `settings`.
    pub fn variables(&self) -> Variables {
        let mut vars: Variables = self
            .settings
            .iter()
            .map(|(key, value)| (key.clone(), Value::from(value.clone())))
            .collect();

        vars.insert(
            "settings".to_string(),
            Value::from(JsonValue::Object(self.settings.clone())),
        );

        vars.extend(
            self.event
                .variables()
                .into_iter()
                .map(|(key, value)| (key, Value::Str(value))),
        );

        vars
    }
}

fn invalid_setting(key: &str, expected: &str, got: &JsonValue) -> HandlerError {
    HandlerError::InvalidSetting {
        key: key.to_string(),
        reason: format!("expected {}, got {}", expected, got),
    }
}

/// A configured unit of side-effect logic.
///
/// Implementations are built by a [`HandlerCatalog`](crate::HandlerCatalog)
/// for one dispatch and dropped afterwards.
#[async_trait]
pub trait Handler: Send + Sync {
    fn context(&self) -> &HandlerContext;

    /// Whether the handler should run for this event.
    fn condition(&self, evaluator: &Evaluator) -> Result<bool, ExpressionError> {
        let ctx = self.context();
        evaluator.eval_bool(&ctx.condition_source(), &ctx.variables())
    }

    /// Perform the side effect.
    async fn execute(&self) -> Result<(), HandlerError>;
}
