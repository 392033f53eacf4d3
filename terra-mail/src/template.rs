//! Inline Handlebars rendering for subjects and bodies.

use handlebars::Handlebars;
use serde_json::Value as JsonValue;

use crate::Result;

/// Renders template strings held in handler settings.
pub struct HandlebarsEngine {
    handlebars: Handlebars<'static>,
}

impl HandlebarsEngine {
    /// Engine for HTML bodies; values are HTML-escaped.
    pub fn new() -> Self {
        Self {
            handlebars: Handlebars::new(),
        }
    }

    /// Engine for subjects and plain-text bodies; values are inserted
    /// verbatim.
    pub fn plain_text() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Make variables missing from the context an error. By default
    /// they render as empty strings.
    pub fn strict(mut self) -> Self {
        self.handlebars.set_strict_mode(true);
        self
    }

    pub fn render_str(&self, template: &str, context: &JsonValue) -> Result<String> {
        Ok(self.handlebars.render_template(template, context)?)
    }
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new()
    }
}
