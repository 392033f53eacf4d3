//! Reference-to-constructor mapping for handlers.

use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use terra_mail::Mailer;

use crate::error::HandlerResolutionError;
use crate::expression::Evaluator;
use crate::handler::{Handler, HandlerContext};
use crate::handlers::{SendEmail, UpdateExpiryDate};
use crate::store::RecordStore;

/// Builds a handler from its context.
pub type HandlerConstructor = Arc<dyn Fn(HandlerContext) -> Box<dyn Handler> + Send + Sync>;

/// Collaborators shared by the built-in handlers.
#[derive(Clone)]
pub struct HandlerServices {
    pub mailer: Mailer,
    pub store: Arc<dyn RecordStore>,
    pub evaluator: Evaluator,
}

impl HandlerServices {
    pub fn new(mailer: Mailer, store: Arc<dyn RecordStore>) -> Self {
        Self {
            mailer,
            store,
            evaluator: Evaluator::new(),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }
}

#[derive(Clone)]
struct CatalogEntry {
    defaults: Map<String, JsonValue>,
    constructor: HandlerConstructor,
}

/// Known handler variants, keyed by reference string.
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the built-in handlers, each registered under its
    /// short name and under `terra.events.<Name>`.
    pub fn with_builtins(services: HandlerServices) -> Self {
        let mut catalog = Self::new();

        let send_email = services.clone();
        catalog.register_aliased(SendEmail::NAME, SendEmail::defaults(), move |ctx| {
            Box::new(SendEmail::new(ctx, send_email.clone()))
        });

        let update_expiry = services;
        catalog.register_aliased(
            UpdateExpiryDate::NAME,
            UpdateExpiryDate::defaults(),
            move |ctx| Box::new(UpdateExpiryDate::new(ctx, update_expiry.store.clone())),
        );

        catalog
    }

    /// Register a constructor under `reference`. An existing entry with
    /// the same reference is replaced.
    pub fn register<F>(
        &mut self,
        reference: impl Into<String>,
        defaults: Map<String, JsonValue>,
        constructor: F,
    ) where
        F: Fn(HandlerContext) -> Box<dyn Handler> + Send + Sync + 'static,
    {
        self.entries.insert(
            reference.into(),
            CatalogEntry {
                defaults,
                constructor: Arc::new(constructor),
            },
        );
    }

    fn register_aliased<F>(&mut self, name: &str, defaults: Map<String, JsonValue>, constructor: F)
    where
        F: Fn(HandlerContext) -> Box<dyn Handler> + Send + Sync + 'static,
    {
        let entry = CatalogEntry {
            defaults,
            constructor: Arc::new(constructor),
        };
        self.entries
            .insert(format!("terra.events.{}", name), entry.clone());
        self.entries.insert(name.to_string(), entry);
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.entries.contains_key(reference)
    }

    /// Registered references, sorted.
    pub fn references(&self) -> Vec<String> {
        let mut refs: Vec<String> = self.entries.keys().cloned().collect();
        refs.sort();
        refs
    }

    /// Build the handler `reference` names.
    ///
    /// The context's settings are laid over the registered defaults;
    /// keys present in the context win.
    pub fn build(
        &self,
        reference: &str,
        context: HandlerContext,
    ) -> Result<Box<dyn Handler>, HandlerResolutionError> {
        let entry = self
            .entries
            .get(reference)
            .ok_or_else(|| HandlerResolutionError::UnknownReference(reference.to_string()))?;

        let mut settings = entry.defaults.clone();
        settings.extend(context.settings().clone());
        let context = HandlerContext::new(reference, settings, context.shared_event());

        Ok((entry.constructor)(context))
    }
}

impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCatalog")
            .field("references", &self.references())
            .finish()
    }
}
