//! Event Bus implementation

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use terra_config::{ConditionFailure, EventSettings};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::catalog::{HandlerCatalog, HandlerServices};
use crate::error::{EventBusError, Result};
use crate::event::Event;
use crate::expression::{Evaluator, EvaluatorLimits};
use crate::handler::HandlerContext;
use crate::registry::HandlerRegistry;

/// Anything events can be published to.
///
/// Producers take an `Arc<dyn EventPublisher>` instead of reaching for a
/// global bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: Event) -> std::result::Result<DispatchReport, EventBusError>;
}

/// Dispatches events to the handlers configured for their action.
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<HandlerRegistry>,
    catalog: Arc<HandlerCatalog>,
    evaluator: Evaluator,
    config: Arc<EventBusConfig>,
}

/// Event bus configuration
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Record execution failures and keep going instead of aborting
    pub continue_on_error: bool,

    /// What a failing condition expression means
    pub condition_failure: ConditionFailure,

    /// Bounds on condition expressions
    pub limits: EvaluatorLimits,

    /// Enable event logging
    pub enable_logging: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            condition_failure: ConditionFailure::Skip,
            limits: EvaluatorLimits::default(),
            enable_logging: true,
        }
    }
}

impl From<&EventSettings> for EventBusConfig {
    fn from(settings: &EventSettings) -> Self {
        Self {
            continue_on_error: settings.continue_on_error,
            condition_failure: settings.condition_failure,
            limits: EvaluatorLimits {
                max_length: settings.max_expression_length,
                max_depth: settings.max_expression_depth,
            },
            enable_logging: true,
        }
    }
}

/// A handler whose execution failed while the bus kept going.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerFailure {
    pub handler: String,
    pub error: String,
}

/// What happened to each configured handler during one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub event_id: Uuid,
    pub action: String,
    /// Handlers that ran to completion
    pub executed: Vec<String>,
    /// Handlers whose condition was false or failed
    pub skipped: Vec<String>,
    /// References the catalog could not build
    pub unresolved: Vec<String>,
    /// Handlers that failed while `continue_on_error` was set
    pub failed: Vec<HandlerFailure>,
}

impl DispatchReport {
    fn new(event: &Event) -> Self {
        Self {
            event_id: event.id,
            action: event.action.clone(),
            executed: Vec::new(),
            skipped: Vec::new(),
            unresolved: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Number of configured handlers the dispatch looked at.
    pub fn total(&self) -> usize {
        self.executed.len() + self.skipped.len() + self.unresolved.len() + self.failed.len()
    }

    /// True when nothing was unresolved or failed.
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.failed.is_empty()
    }
}

impl EventBus {
    /// Create an event bus over a registry and a catalog
    pub fn new(registry: Arc<HandlerRegistry>, catalog: Arc<HandlerCatalog>) -> Self {
        Self::with_config(registry, catalog, EventBusConfig::default())
    }

    /// Create event bus with custom config
    pub fn with_config(
        registry: Arc<HandlerRegistry>,
        catalog: Arc<HandlerCatalog>,
        config: EventBusConfig,
    ) -> Self {
        Self {
            registry,
            catalog,
            evaluator: Evaluator::with_limits(config.limits),
            config: Arc::new(config),
        }
    }

    pub fn builder(registry: Arc<HandlerRegistry>, catalog: Arc<HandlerCatalog>) -> EventBusBuilder {
        EventBusBuilder::new(registry, catalog)
    }

    /// Build a bus from settings: handler rows come from
    /// `handlers_file` when set, the catalog holds the built-in handlers.
    pub fn from_settings(settings: &EventSettings, services: HandlerServices) -> Result<Self> {
        let registry = match &settings.handlers_file {
            Some(path) => HandlerRegistry::from_file(path)?,
            None => HandlerRegistry::new(),
        };

        let config = EventBusConfig::from(settings);
        let services = services.with_evaluator(Evaluator::with_limits(config.limits));
        let catalog = HandlerCatalog::with_builtins(services);

        Ok(Self::with_config(
            Arc::new(registry),
            Arc::new(catalog),
            config,
        ))
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &HandlerCatalog {
        &self.catalog
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Dispatch `event` to every handler configured for its action.
    ///
    /// Handlers run one after the other in registry order. A reference
    /// the catalog cannot build is logged and skipped. A failing
    /// condition skips the handler unless the bus is configured to raise.
    /// An execution failure aborts the dispatch unless
    /// `continue_on_error` is set.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let report = bus.send(Event::new("REQUEST_APPROVED").with("foo", "bar")).await?;
    /// assert!(report.is_clean());
    /// ```
    pub async fn send(&self, event: Event) -> std::result::Result<DispatchReport, EventBusError> {
        let event = Arc::new(event);
        let mut report = DispatchReport::new(&event);
        let configs = self.registry.for_action(&event.action);

        if self.config.enable_logging {
            info!(
                action = %event.action,
                event_id = %event.id,
                handlers = configs.len(),
                "Dispatching event"
            );
        }

        for config in configs {
            let reference = config.handler;
            let context = HandlerContext::new(&reference, config.settings, Arc::clone(&event));

            let handler = match self.catalog.build(&reference, context) {
                Ok(handler) => handler,
                Err(e) => {
                    warn!(action = %event.action, handler = %reference, error = %e, "Cannot resolve handler");
                    report.unresolved.push(reference);
                    continue;
                }
            };

            match handler.condition(&self.evaluator) {
                Ok(true) => {}
                Ok(false) => {
                    if self.config.enable_logging {
                        debug!(action = %event.action, handler = %reference, "Condition not met");
                    }
                    report.skipped.push(reference);
                    continue;
                }
                Err(e) if self.config.condition_failure == ConditionFailure::Raise => {
                    error!(action = %event.action, handler = %reference, error = %e, "Condition failed");
                    return Err(EventBusError::Condition {
                        handler: reference,
                        source: e,
                    });
                }
                Err(e) => {
                    warn!(
                        action = %event.action,
                        handler = %reference,
                        error = %e,
                        "Condition failed, skipping handler"
                    );
                    report.skipped.push(reference);
                    continue;
                }
            }

            match handler.execute().await {
                Ok(()) => {
                    if self.config.enable_logging {
                        debug!(action = %event.action, handler = %reference, "Handler executed");
                    }
                    report.executed.push(reference);
                }
                Err(e) if self.config.continue_on_error => {
                    error!(action = %event.action, handler = %reference, error = %e, "Handler failed");
                    report.failed.push(HandlerFailure {
                        handler: reference,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    error!(action = %event.action, handler = %reference, error = %e, "Handler failed, aborting dispatch");
                    return Err(EventBusError::Execution {
                        handler: reference,
                        source: e,
                    });
                }
            }
        }

        if self.config.enable_logging {
            debug!(
                action = %event.action,
                executed = report.executed.len(),
                skipped = report.skipped.len(),
                unresolved = report.unresolved.len(),
                failed = report.failed.len(),
                "Event dispatched"
            );
        }

        Ok(report)
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, event: Event) -> std::result::Result<DispatchReport, EventBusError> {
        self.send(event).await
    }
}

/// Event bus builder
pub struct EventBusBuilder {
    registry: Arc<HandlerRegistry>,
    catalog: Arc<HandlerCatalog>,
    config: EventBusConfig,
}

impl EventBusBuilder {
    /// Create new event bus builder
    pub fn new(registry: Arc<HandlerRegistry>, catalog: Arc<HandlerCatalog>) -> Self {
        Self {
            registry,
            catalog,
            config: EventBusConfig::default(),
        }
    }

    /// Enable/disable continue on error
    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.config.continue_on_error = enabled;
        self
    }

    pub fn condition_failure(mut self, mode: ConditionFailure) -> Self {
        self.config.condition_failure = mode;
        self
    }

    pub fn limits(mut self, limits: EvaluatorLimits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    /// Build the event bus
    pub fn build(self) -> EventBus {
        EventBus::with_config(self.registry, self.catalog, self.config)
    }
}
