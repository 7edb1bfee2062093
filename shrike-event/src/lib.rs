//! Shrike Event Model
//!
//! This module defines the normalized event record that flows through the
//! engine. Events are immutable once enqueued; producers build them through
//! the [`EventBuilder`] or the [`Event::record`] shortcut.

use ahash::AHashMap;
use shrike_schema::{ScalarValue, TimestampWall};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Process-wide monotonic event id counter. Ids are unique within a run;
/// collisions across runs are acceptable.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Produce the next `evt_<n>` id
pub fn next_event_id() -> String {
    format!("evt_{}", EVENT_SEQ.fetch_add(1, Ordering::Relaxed))
}

/// Current wall-clock time in nanoseconds since the Unix epoch
pub fn now_wall_ns() -> TimestampWall {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// A normalized event
#[derive(Debug, Clone)]
pub struct Event {
    /// Unique event id within a process run (`evt_<n>`)
    pub id: String,

    /// Producer identifier (e.g. `file:/path`, `socket:12345`)
    pub source: String,

    /// Event classification (e.g. `sensor_reading`, `heartbeat`)
    pub event_type: String,

    /// Wall clock instant recorded at normalization
    pub timestamp_ns: TimestampWall,

    /// Key to scalar data, keys unique per event
    pub data: AHashMap<String, ScalarValue>,
}

impl Event {
    /// Start an event record with a fresh id and the current wall clock.
    /// The caller supplies data through [`Event::with_value`] before
    /// handing the event to the queue.
    pub fn record(source: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            id: next_event_id(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp_ns: now_wall_ns(),
            data: AHashMap::new(),
        }
    }

    /// Add one data entry
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Look up a data value by key
    pub fn get(&self, key: &str) -> Option<&ScalarValue> {
        self.data.get(key)
    }

    /// Check whether a data key is present
    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Create an event builder
    pub fn builder() -> EventBuilder {
        EventBuilder::default()
    }
}

/// Event builder for explicit construction, mostly in tests and adapters
/// that need to control every field
#[derive(Debug, Default)]
pub struct EventBuilder {
    id: Option<String>,
    source: Option<String>,
    event_type: Option<String>,
    timestamp_ns: Option<TimestampWall>,
    data: AHashMap<String, ScalarValue>,
}

impl EventBuilder {
    /// Set the event id (defaults to the next `evt_<n>`)
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the producer identifier
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the event type
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Set the wall clock timestamp (defaults to now)
    pub fn timestamp_ns(mut self, ts: TimestampWall) -> Self {
        self.timestamp_ns = Some(ts);
        self
    }

    /// Add a data entry
    pub fn value(mut self, key: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Build the event, enforcing the non-empty field invariants
    pub fn build(self) -> Result<Event, BuildError> {
        let id = match self.id {
            Some(id) => id,
            None => next_event_id(),
        };
        let source = self.source.ok_or(BuildError::MissingField("source"))?;
        let event_type = self
            .event_type
            .ok_or(BuildError::MissingField("event_type"))?;

        if id.is_empty() {
            return Err(BuildError::EmptyField("id"));
        }
        if source.is_empty() {
            return Err(BuildError::EmptyField("source"));
        }
        if event_type.is_empty() {
            return Err(BuildError::EmptyField("event_type"));
        }

        Ok(Event {
            id,
            source,
            event_type,
            timestamp_ns: self.timestamp_ns.unwrap_or_else(now_wall_ns),
            data: self.data,
        })
    }
}

/// Error building an event
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field must be non-empty: {0}")]
    EmptyField(&'static str),
}

// Re-export the schema crate for convenience
pub use shrike_schema;
