//! Handler configuration rows and the registry that orders them.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use terra_config::ConfigLoader;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::RegistryError;

/// Priority given to rows that do not set one.
pub const DEFAULT_PRIORITY: i32 = 10;

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// One configured handler for one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHandlerConfig {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Action the handler listens to
    pub action: String,

    /// Catalog reference of the handler, e.g. `terra.events.SendEmail`
    pub handler: String,

    /// Handler settings, merged over the handler's defaults
    #[serde(default)]
    pub settings: Map<String, JsonValue>,

    /// Lower priorities run first
    #[serde(default = "default_priority")]
    pub priority: i32,
}

impl EventHandlerConfig {
    pub fn new(action: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: action.into(),
            handler: handler.into(),
            settings: Map::new(),
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Set a single setting.
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    config: EventHandlerConfig,
}

#[derive(Deserialize)]
struct HandlersFile {
    handlers: Vec<EventHandlerConfig>,
}

/// Registry of handler configurations keyed by id.
///
/// Rows for an action come back ordered by ascending priority; rows with
/// equal priority keep the order they were added in.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    entries: DashMap<Uuid, Entry>,
    next_seq: AtomicU64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rows from a TOML or JSON file.
    ///
    /// TOML files hold `[[handlers]]` tables; JSON files hold either an
    /// array of rows or an object with a `handlers` array.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let value = ConfigLoader::auto(path)?.load_file(path)?;

        let configs: Vec<EventHandlerConfig> = match value {
            JsonValue::Array(_) => serde_json::from_value(value),
            other => serde_json::from_value::<HandlersFile>(other).map(|file| file.handlers),
        }
        .map_err(|e| RegistryError::Invalid(e.to_string()))?;

        let registry = Self::new();
        registry.load(configs)?;

        info!(
            path = %path.display(),
            handlers = registry.len(),
            "Loaded handler configurations"
        );
        Ok(registry)
    }

    /// Add a row and return its id.
    pub fn add(&self, config: EventHandlerConfig) -> Result<Uuid, RegistryError> {
        let id = config.id;
        match self.entries.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RegistryError::Duplicate(id)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                debug!(
                    id = %id,
                    action = %config.action,
                    handler = %config.handler,
                    "Registered handler"
                );
                slot.insert(Entry {
                    seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
                    config,
                });
                Ok(id)
            }
        }
    }

    /// Add every row, stopping at the first duplicate.
    pub fn load(
        &self,
        configs: impl IntoIterator<Item = EventHandlerConfig>,
    ) -> Result<(), RegistryError> {
        for config in configs {
            self.add(config)?;
        }
        Ok(())
    }

    /// Replace an existing row. The row keeps its place among equal
    /// priorities.
    pub fn update(&self, config: EventHandlerConfig) -> Result<(), RegistryError> {
        let mut entry = self
            .entries
            .get_mut(&config.id)
            .ok_or(RegistryError::NotFound(config.id))?;
        entry.config = config;
        Ok(())
    }

    pub fn remove(&self, id: Uuid) -> Option<EventHandlerConfig> {
        self.entries.remove(&id).map(|(_, entry)| entry.config)
    }

    pub fn get(&self, id: Uuid) -> Option<EventHandlerConfig> {
        self.entries.get(&id).map(|entry| entry.config.clone())
    }

    /// Rows registered for `action`, in dispatch order.
    pub fn for_action(&self, action: &str) -> Vec<EventHandlerConfig> {
        let mut rows: Vec<(i32, u64, EventHandlerConfig)> = self
            .entries
            .iter()
            .filter(|entry| entry.config.action == action)
            .map(|entry| (entry.config.priority, entry.seq, entry.config.clone()))
            .collect();
        rows.sort_by_key(|(priority, seq, _)| (*priority, *seq));
        rows.into_iter().map(|(_, _, config)| config).collect()
    }

    /// Every row, grouped by action name and in dispatch order.
    pub fn all(&self) -> Vec<EventHandlerConfig> {
        self.actions()
            .iter()
            .flat_map(|action| self.for_action(action))
            .collect()
    }

    /// Distinct action names, sorted.
    pub fn actions(&self) -> Vec<String> {
        let mut actions: Vec<String> = self
            .entries
            .iter()
            .map(|entry| entry.config.action.clone())
            .collect();
        actions.sort();
        actions.dedup();
        actions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
