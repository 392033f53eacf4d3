//! End-to-end dispatch through the built-in handlers.

use serde_json::json;
use std::sync::Arc;
use terra_config::EventSettings;
use terra_events::*;
use terra_mail::{Mailer, MemoryTransport};

struct Harness {
    outbox: MemoryTransport,
    store: Arc<MemoryStore>,
    services: HandlerServices,
}

impl Harness {
    fn new() -> Self {
        let outbox = MemoryTransport::new();
        let store = Arc::new(MemoryStore::new());
        let mailer = Mailer::new(outbox.clone())
            .default_from("noreply@terra.local")
            .unwrap();
        let services = HandlerServices::new(mailer, store.clone());
        Self {
            outbox,
            store,
            services,
        }
    }

    fn bus(&self, registry: HandlerRegistry) -> EventBus {
        EventBus::new(
            Arc::new(registry),
            Arc::new(HandlerCatalog::with_builtins(self.services.clone())),
        )
    }
}

#[tokio::test]
async fn send_email_reaches_every_recipient() {
    let harness = Harness::new();
    let registry = HandlerRegistry::new();
    registry
        .add(
            EventHandlerConfig::new("REQUEST_APPROVED", "terra.events.SendEmail")
                .setting("RECIPIENT_EMAILS", "split(reviewers, ',')")
                .setting("SUBJECT_TPL", "Request {{request}} approved")
                .setting("BODY_TPL", "{{user}} approved layer {{layer}}."),
        )
        .unwrap();

    let report = harness
        .bus(registry)
        .send(
            Event::new("REQUEST_APPROVED")
                .user(UserRef::new("1").with_email("ada@example.com"))
                .with("reviewers", "kim@example.com,lee@example.com")
                .with("request", 42)
                .with("layer", "roads"),
        )
        .await
        .unwrap();

    assert_eq!(report.executed, vec!["terra.events.SendEmail"]);

    let outbox = harness.outbox.outbox();
    assert_eq!(outbox.len(), 2);
    let recipients: Vec<&str> = outbox.iter().map(|m| m.to[0].email.as_str()).collect();
    assert_eq!(recipients, vec!["kim@example.com", "lee@example.com"]);
    for message in &outbox {
        assert_eq!(message.subject.as_deref(), Some("Request 42 approved"));
        assert_eq!(
            message.text.as_deref(),
            Some("ada@example.com approved layer roads.")
        );
    }
}

#[tokio::test]
async fn handlers_from_file_run_in_priority_order() {
    let harness = Harness::new();
    let reference = InstanceRef::new("request", "42");
    harness
        .store
        .insert(Record::new(reference.clone()).with("expiry_date", "2024-01-31"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("handlers.toml");
    std::fs::write(
        &path,
        r#"
        [[handlers]]
        action = "REQUEST_APPROVED"
        handler = "SendEmail"
        priority = 20
        settings = { RECIPIENT_EMAILS = "[user_email]", CONDITION = "status == 'approved'" }

        [[handlers]]
        action = "REQUEST_APPROVED"
        handler = "UpdateExpiryDate"
        priority = 5
        settings = { DAYS = 30, CONDITION = "status == 'approved'" }

        [[handlers]]
        action = "REQUEST_APPROVED"
        handler = "legacy.handlers.Fax"
        "#,
    )
    .unwrap();

    let bus = harness.bus(HandlerRegistry::from_file(&path).unwrap());
    let report = bus
        .send(
            Event::new("REQUEST_APPROVED")
                .instance(reference.clone())
                .user(UserRef::new("1").with_email("ada@example.com"))
                .with("status", "approved"),
        )
        .await
        .unwrap();

    assert_eq!(report.executed, vec!["UpdateExpiryDate", "SendEmail"]);
    assert_eq!(report.unresolved, vec!["legacy.handlers.Fax"]);
    assert_eq!(
        harness.store.get(&reference).unwrap().get("expiry_date"),
        Some(&json!("2024-03-01"))
    );
    assert_eq!(harness.outbox.len(), 1);
}

#[tokio::test]
async fn failing_execution_stops_later_handlers() {
    let harness = Harness::new();
    let registry = HandlerRegistry::new();
    registry
        .load([
            EventHandlerConfig::new("LAYER_EXPIRED", "UpdateExpiryDate").priority(1),
            EventHandlerConfig::new("LAYER_EXPIRED", "SendEmail")
                .setting("RECIPIENT_EMAILS", "'ops@example.com'")
                .priority(2),
        ])
        .unwrap();

    // no instance on the event
    let result = harness.bus(registry).send(Event::new("LAYER_EXPIRED")).await;

    assert!(matches!(
        result,
        Err(EventBusError::Execution {
            source: HandlerError::MissingInstance,
            ..
        })
    ));
    assert!(harness.outbox.is_empty());
}

struct RequestService {
    events: Arc<dyn EventPublisher>,
}

impl RequestService {
    async fn approve(&self, id: &str) -> DispatchReport {
        self.events
            .publish(
                Event::new("REQUEST_APPROVED")
                    .sender("requests")
                    .instance(InstanceRef::new("request", id)),
            )
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn producers_publish_through_the_trait() {
    let harness = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("handlers.json");
    std::fs::write(
        &path,
        r#"{"handlers": [{
            "action": "REQUEST_APPROVED",
            "handler": "SendEmail",
            "settings": {
                "RECIPIENT_EMAILS": ["desk@example.com"],
                "SUBJECT_TPL": "{{instance}} approved by {{sender}}",
                "CONDITION": "instance_model == 'request'"
            }
        }]}"#,
    )
    .unwrap();

    let settings = EventSettings {
        handlers_file: Some(path),
        ..EventSettings::default()
    };
    let bus = EventBus::from_settings(&settings, harness.services.clone()).unwrap();
    let service = RequestService {
        events: Arc::new(bus),
    };

    let report = service.approve("9").await;

    assert_eq!(report.executed, vec!["SendEmail"]);
    let outbox = harness.outbox.outbox();
    assert_eq!(
        outbox[0].subject.as_deref(),
        Some("request:9 approved by requests")
    );
}
