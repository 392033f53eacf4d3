//! `terra handlers`: list configured handler rows.

use colored::Colorize;
use terra_events::handler::CONDITION;
use terra_events::{EventBus, EventHandlerConfig};

use crate::error::{CliError, CliResult};

/// Rows for `action`, or every row grouped by action.
pub fn rows(bus: &EventBus, action: Option<&str>) -> Vec<EventHandlerConfig> {
    match action {
        Some(action) => bus.registry().for_action(action),
        None => bus.registry().all(),
    }
}

pub fn execute(bus: &EventBus, action: Option<&str>, json: bool) -> CliResult<()> {
    let rows = rows(bus, action);

    if json {
        let rendered = serde_json::to_string_pretty(&rows)
            .map_err(|e| CliError::Dispatch(e.to_string()))?;
        println!("{}", rendered);
        return Ok(());
    }

    if rows.is_empty() {
        println!("{}", "No handlers configured.".dimmed());
        return Ok(());
    }

    let mut current: Option<&str> = None;
    for row in &rows {
        if current != Some(row.action.as_str()) {
            println!("{}", row.action.bold());
            current = Some(row.action.as_str());
        }

        let reference = if bus.catalog().contains(&row.handler) {
            row.handler.green()
        } else {
            format!("{} (unknown)", row.handler).red()
        };
        println!("  {:>4}  {}", row.priority, reference);

        if let Some(condition) = row.settings.get(CONDITION) {
            let condition = condition
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| condition.to_string());
            println!("        {} {}", "if".dimmed(), condition);
        }
        for (key, value) in row.settings.iter().filter(|(k, _)| *k != CONDITION) {
            println!("        {} = {}", key.dimmed(), value);
        }
    }

    println!();
    println!("  {} handler(s)", rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use terra_events::{HandlerCatalog, HandlerRegistry, HandlerServices, MemoryStore};
    use terra_mail::{Mailer, MemoryTransport};

    fn bus() -> EventBus {
        let registry = HandlerRegistry::new();
        registry
            .load([
                EventHandlerConfig::new("B_ACTION", "SendEmail").priority(20),
                EventHandlerConfig::new("A_ACTION", "UpdateExpiryDate"),
                EventHandlerConfig::new("B_ACTION", "UpdateExpiryDate").priority(1),
            ])
            .unwrap();
        let services = HandlerServices::new(
            Mailer::new(MemoryTransport::new()),
            Arc::new(MemoryStore::new()),
        );
        EventBus::new(
            Arc::new(registry),
            Arc::new(HandlerCatalog::with_builtins(services)),
        )
    }

    #[test]
    fn test_rows_grouped_and_ordered() {
        let bus = bus();
        let all: Vec<(String, String)> = rows(&bus, None)
            .into_iter()
            .map(|r| (r.action, r.handler))
            .collect();
        assert_eq!(
            all,
            vec![
                ("A_ACTION".to_string(), "UpdateExpiryDate".to_string()),
                ("B_ACTION".to_string(), "UpdateExpiryDate".to_string()),
                ("B_ACTION".to_string(), "SendEmail".to_string()),
            ]
        );
        assert_eq!(rows(&bus, Some("B_ACTION")).len(), 2);
        assert!(rows(&bus, Some("NOPE")).is_empty());
    }
}
