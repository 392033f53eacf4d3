use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::{Map, Value as JsonValue, json};
use std::sync::Arc;
use tracing::info;

use crate::error::HandlerError;
use crate::handler::{Handler, HandlerContext};
use crate::store::RecordStore;

/// Number of days to add.
pub const DAYS: &str = "DAYS";
/// Name of the date field to update.
pub const FIELD: &str = "FIELD";
/// Field updated when `FIELD` is not set.
pub const DEFAULT_FIELD: &str = "expiry_date";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Pushes a date field of the event's record forward by `DAYS` days.
///
/// The new date counts from the stored one, or from today when the field
/// is absent or null, and is written back as `YYYY-MM-DD`.
pub struct UpdateExpiryDate {
    context: HandlerContext,
    store: Arc<dyn RecordStore>,
}

impl UpdateExpiryDate {
    pub const NAME: &'static str = "UpdateExpiryDate";

    pub fn new(context: HandlerContext, store: Arc<dyn RecordStore>) -> Self {
        Self { context, store }
    }

    pub fn defaults() -> Map<String, JsonValue> {
        let JsonValue::Object(defaults) = json!({ DAYS: 0, FIELD: DEFAULT_FIELD }) else {
            return Map::new();
        };
        defaults
    }
}

fn parse_date(field: &str, value: &JsonValue) -> Result<Option<NaiveDate>, HandlerError> {
    let invalid = |reason: String| HandlerError::InvalidField {
        field: field.to_string(),
        reason,
    };

    match value {
        JsonValue::Null => Ok(None),
        JsonValue::String(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.date_naive()))
            .map(Some)
            .map_err(|_| invalid(format!("'{}' is not a date", s))),
        other => Err(invalid(format!("expected a date string, got {}", other))),
    }
}

#[async_trait]
impl Handler for UpdateExpiryDate {
    fn context(&self) -> &HandlerContext {
        &self.context
    }

    async fn execute(&self) -> Result<(), HandlerError> {
        let reference = self
            .context
            .event()
            .instance
            .as_ref()
            .ok_or(HandlerError::MissingInstance)?;

        let days = self.context.setting_i64(DAYS)?.unwrap_or(0);
        let field = self.context.setting_str(FIELD)?.unwrap_or(DEFAULT_FIELD);

        let mut record = self
            .store
            .fetch(reference)
            .await?
            .ok_or_else(|| HandlerError::RecordNotFound(reference.to_string()))?;

        let base = match record.get(field) {
            Some(value) => parse_date(field, value)?,
            None => None,
        }
        .unwrap_or_else(|| Utc::now().date_naive());

        let updated = Duration::try_days(days)
            .and_then(|delta| base.checked_add_signed(delta))
            .ok_or_else(|| HandlerError::InvalidField {
                field: field.to_string(),
                reason: format!("{} + {} days is out of range", base, days),
            })?;

        let formatted = updated.format(DATE_FORMAT).to_string();
        record
            .fields
            .insert(field.to_string(), JsonValue::String(formatted.clone()));
        self.store.save(record).await?;

        info!(
            record = %reference,
            field = %field,
            from = %base,
            to = %formatted,
            "Updated expiry date"
        );
        Ok(())
    }
}
