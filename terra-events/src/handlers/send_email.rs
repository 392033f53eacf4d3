use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue, json};
use terra_mail::{Address, Email, HandlebarsEngine};
use tracing::{debug, info, warn};

use crate::catalog::HandlerServices;
use crate::error::HandlerError;
use crate::expression::Variables;
use crate::handler::{Handler, HandlerContext};

/// Expression (or JSON list) yielding the recipient addresses.
pub const RECIPIENT_EMAILS: &str = "RECIPIENT_EMAILS";
/// Handlebars template of the subject line.
pub const SUBJECT_TPL: &str = "SUBJECT_TPL";
/// Handlebars template of the plain-text body.
pub const BODY_TPL: &str = "BODY_TPL";
/// Optional Handlebars template of an HTML body.
pub const HTML_TPL: &str = "HTML_TPL";
/// Sender address; the mailer's default when absent.
pub const FROM_EMAIL: &str = "FROM_EMAIL";

/// Sends one message per recipient.
///
/// Templates see the handler variables: the settings plus the event's
/// stringified variables. Delivery failures and malformed recipient
/// addresses are logged and skipped.
pub struct SendEmail {
    context: HandlerContext,
    services: HandlerServices,
}

impl SendEmail {
    pub const NAME: &'static str = "SendEmail";

    pub fn new(context: HandlerContext, services: HandlerServices) -> Self {
        Self { context, services }
    }

    pub fn defaults() -> Map<String, JsonValue> {
        let JsonValue::Object(defaults) = json!({
            RECIPIENT_EMAILS: "[]",
            SUBJECT_TPL: "{{action}}",
            BODY_TPL: "",
        }) else {
            return Map::new();
        };
        defaults
    }

    fn recipients(&self, vars: &Variables) -> Result<Vec<String>, HandlerError> {
        match self.context.setting(RECIPIENT_EMAILS) {
            None | Some(JsonValue::Null) => Ok(Vec::new()),
            Some(JsonValue::String(src)) => Ok(self.services.evaluator.eval_strings(src, vars)?),
            Some(JsonValue::Array(items)) => Ok(items
                .iter()
                .map(|item| match item {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()),
            Some(other) => Err(HandlerError::InvalidSetting {
                key: RECIPIENT_EMAILS.to_string(),
                reason: format!("expected an expression or a list, got {}", other),
            }),
        }
    }

    fn render(
        &self,
        engine: &HandlebarsEngine,
        key: &str,
        data: &JsonValue,
    ) -> Result<Option<String>, HandlerError> {
        let Some(template) = self.context.setting_str(key)? else {
            return Ok(None);
        };
        engine
            .render_str(template, data)
            .map(Some)
            .map_err(|e| HandlerError::Template(format!("{}: {}", key, e)))
    }
}

#[async_trait]
impl Handler for SendEmail {
    fn context(&self) -> &HandlerContext {
        &self.context
    }

    async fn execute(&self) -> Result<(), HandlerError> {
        let vars = self.context.variables();
        let recipients = self.recipients(&vars)?;

        if recipients.is_empty() {
            debug!(action = %self.context.action(), "No recipients, nothing to send");
            return Ok(());
        }

        let data = JsonValue::Object(
            vars.iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
        );

        let plain = HandlebarsEngine::plain_text();
        let subject = self
            .render(&plain, SUBJECT_TPL, &data)?
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let body = self.render(&plain, BODY_TPL, &data)?.unwrap_or_default();
        let html = self.render(&HandlebarsEngine::new(), HTML_TPL, &data)?;

        let from = self
            .context
            .setting_str(FROM_EMAIL)?
            .map(Address::parse)
            .transpose()?;

        let mut sent = 0usize;
        for recipient in &recipients {
            let to = match Address::parse(recipient) {
                Ok(to) => to,
                Err(e) => {
                    warn!(recipient = %recipient, error = %e, "Skipping invalid recipient");
                    continue;
                }
            };

            let mut email = Email::new().to(to).subject(subject.as_str()).text(body.as_str());
            if let Some(html) = &html {
                email = email.html(html.as_str());
            }
            if let Some(from) = &from {
                email = email.from(from.clone());
            }

            match self.services.mailer.send(email).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    warn!(recipient = %recipient, error = %e, "Failed to deliver notification");
                }
            }
        }

        info!(
            action = %self.context.action(),
            sent,
            recipients = recipients.len(),
            "Sent notification email"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, UserRef};
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use terra_mail::{Mailer, MemoryTransport};

    fn handler(settings: JsonValue, event: Event) -> (SendEmail, MemoryTransport) {
        let transport = MemoryTransport::new();
        let mailer = Mailer::new(transport.clone())
            .default_from("noreply@terra.local")
            .unwrap();
        let services = HandlerServices::new(mailer, Arc::new(MemoryStore::new()));

        let mut merged = SendEmail::defaults();
        if let JsonValue::Object(settings) = settings {
            merged.extend(settings);
        }
        let ctx = HandlerContext::new(SendEmail::NAME, merged, Arc::new(event));
        (SendEmail::new(ctx, services), transport)
    }

    #[tokio::test]
    async fn test_one_message_per_recipient() {
        let (handler, transport) = handler(
            json!({
                "RECIPIENT_EMAILS": "[user_email, 'ops@example.com']",
                "SUBJECT_TPL": "Request {{request}} approved",
                "BODY_TPL": "Hello {{user}}, layer {{layer}} is <ready>.",
            }),
            Event::new("REQUEST_APPROVED")
                .user(UserRef::new("1").with_email("ada@example.com"))
                .with("request", 42)
                .with("layer", "roads"),
        );

        handler.execute().await.unwrap();

        let outbox = transport.outbox();
        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox[0].to[0].email, "ada@example.com");
        assert_eq!(outbox[1].to[0].email, "ops@example.com");
        for email in &outbox {
            assert_eq!(email.subject.as_deref(), Some("Request 42 approved"));
            assert_eq!(
                email.text.as_deref(),
                Some("Hello ada@example.com, layer roads is <ready>.")
            );
            assert_eq!(
                email.from.as_ref().map(|a| a.email.as_str()),
                Some("noreply@terra.local")
            );
        }
    }

    #[tokio::test]
    async fn test_delivery_failures_are_swallowed() {
        let (handler, transport) = handler(
            json!({
                "RECIPIENT_EMAILS": ["bounce@example.com", "not an address", "ok@example.com"],
                "FROM_EMAIL": "Terra <alerts@terra.local>",
            }),
            Event::new("LAYER_EXPIRED"),
        );
        transport.reject("bounce@example.com");

        handler.execute().await.unwrap();

        let outbox = transport.outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].to[0].email, "ok@example.com");
        assert_eq!(outbox[0].subject.as_deref(), Some("LAYER_EXPIRED"));
        assert_eq!(
            outbox[0].from.as_ref().map(|a| a.email.as_str()),
            Some("alerts@terra.local")
        );
    }

    #[tokio::test]
    async fn test_html_body_is_escaped() {
        let (handler, transport) = handler(
            json!({
                "RECIPIENT_EMAILS": "'a@example.com'",
                "HTML_TPL": "<p>{{name}}</p>",
            }),
            Event::new("X").with("name", "<b>roads</b>"),
        );

        handler.execute().await.unwrap();

        let outbox = transport.outbox();
        assert_eq!(
            outbox[0].html.as_deref(),
            Some("<p>&lt;b&gt;roads&lt;/b&gt;</p>")
        );
    }

    #[tokio::test]
    async fn test_bad_recipient_expression_is_an_error() {
        let (handler, transport) = handler(
            json!({"RECIPIENT_EMAILS": "missing_variable"}),
            Event::new("X"),
        );

        let result = handler.execute().await;
        assert!(matches!(result, Err(HandlerError::Expression(_))));
        assert!(transport.is_empty());
    }

    #[tokio::test]
    async fn test_bad_template_is_an_error() {
        let (handler, _) = handler(
            json!({"RECIPIENT_EMAILS": "'a@example.com'", "SUBJECT_TPL": "{{#if}}"}),
            Event::new("X"),
        );

        assert!(matches!(
            handler.execute().await,
            Err(HandlerError::Template(_))
        ));
    }
}
