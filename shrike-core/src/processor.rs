//! Event processor: normalizes raw input into events.
//!
//! A stateless normalizer holding a handle to one event queue. Every entry
//! point stamps the event id, source, type, and timestamp, then publishes
//! the event; after publication the queue owns it.

use crate::queue::EventQueue;
use ahash::AHashMap;
use serde::Serialize;
use serde_json::Value;
use shrike_event::{BuildError, Event};
use shrike_schema::ScalarValue;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Fields stripped from incoming JSON before data mapping
const RESERVED_KEYS: [&str; 3] = ["type", "_source_id", "_timestamp"];

/// Event type assigned to JSON input without a `type` field
const GENERIC_JSON_EVENT: &str = "generic_json_event";

/// Normalization failure; the event is not produced
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("invalid JSON from {source_id}: {message}")]
    Json { source_id: String, message: String },

    #[error("input from {source_id} must be a JSON object")]
    NotAnObject { source_id: String },

    #[error("could not marshal structured record from {source_id}: {message}")]
    Marshal { source_id: String, message: String },

    #[error("invalid event fields: {0}")]
    Build(#[from] BuildError),
}

#[derive(Clone)]
pub struct EventProcessor {
    queue: Arc<EventQueue>,
}

impl EventProcessor {
    pub fn new(queue: Arc<EventQueue>) -> Self {
        Self { queue }
    }

    /// Normalize a single scalar under the default `"value"` key
    pub fn process_raw_data(
        &self,
        source_id: &str,
        event_type: &str,
        value: impl Into<ScalarValue>,
    ) -> Result<(), ProcessError> {
        self.process_raw_data_with_key(source_id, event_type, "value", value)
    }

    /// Normalize a single scalar under an explicit data key
    pub fn process_raw_data_with_key(
        &self,
        source_id: &str,
        event_type: &str,
        data_key: &str,
        value: impl Into<ScalarValue>,
    ) -> Result<(), ProcessError> {
        let event = Event::builder()
            .source(source_id)
            .event_type(event_type)
            .value(data_key, value)
            .build()?;
        self.publish(event);
        Ok(())
    }

    /// Parse a raw JSON object and normalize its top-level fields.
    ///
    /// A string `type` field becomes the event type (default
    /// `generic_json_event`). Scalars map directly, arrays and nested
    /// objects are stored as their JSON text, nulls are skipped, and the
    /// reserved keys `type`, `_source_id`, `_timestamp` never enter the
    /// data map. On a parse error no event is produced.
    pub fn process_raw_json(&self, source_id: &str, raw_json: &str) -> Result<(), ProcessError> {
        let parsed: Value =
            serde_json::from_str(raw_json).map_err(|e| ProcessError::Json {
                source_id: source_id.to_string(),
                message: e.to_string(),
            })?;

        let obj = parsed.as_object().ok_or_else(|| ProcessError::NotAnObject {
            source_id: source_id.to_string(),
        })?;

        let event_type = obj
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(GENERIC_JSON_EVENT);

        let mut event = Event::builder()
            .source(source_id)
            .event_type(event_type)
            .build()?;
        map_fields(source_id, obj, &mut event.data);

        self.publish(event);
        Ok(())
    }

    /// Marshal any serializable record to a JSON object and normalize it
    /// with the same field-mapping rules as raw JSON input
    pub fn process_structured<T: Serialize>(
        &self,
        source_id: &str,
        event_type: &str,
        record: &T,
    ) -> Result<(), ProcessError> {
        let value = serde_json::to_value(record).map_err(|e| ProcessError::Marshal {
            source_id: source_id.to_string(),
            message: e.to_string(),
        })?;

        let obj = value.as_object().ok_or_else(|| ProcessError::NotAnObject {
            source_id: source_id.to_string(),
        })?;

        let mut event = Event::builder()
            .source(source_id)
            .event_type(event_type)
            .build()?;
        map_fields(source_id, obj, &mut event.data);

        self.publish(event);
        Ok(())
    }

    fn publish(&self, event: Event) {
        let event_id = event.id.clone();
        let source = event.source.clone();
        self.queue.push(event);
        debug!(
            event_id = %event_id,
            source = %source,
            queue_depth = self.queue.len(),
            "event enqueued"
        );
    }
}

/// Apply the JSON field-mapping rules to one object's top-level entries
fn map_fields(
    source_id: &str,
    obj: &serde_json::Map<String, Value>,
    data: &mut AHashMap<String, ScalarValue>,
) {
    for (key, value) in obj {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        match value {
            Value::Null => {
                warn!(source_id, key = %key, "null value skipped");
            }
            Value::Array(_) | Value::Object(_) => {
                warn!(
                    source_id,
                    key = %key,
                    "non-scalar value stored as JSON text"
                );
                data.insert(key.clone(), ScalarValue::String(value.to_string()));
            }
            _ => {
                // from_json cannot fail here: null and composites are
                // handled above, everything else is a scalar.
                if let Some(scalar) = ScalarValue::from_json(value) {
                    data.insert(key.clone(), scalar);
                }
            }
        }
    }
}
