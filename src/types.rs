//! Core domain types for the Graphite handler
//!
//! This module defines the monitoring event read from the host and the
//! plaintext records written to the collector. The event types mirror the
//! JSON document the host hands to every handler on stdin; only the fields
//! the handler reads are modelled, everything else is ignored.

use crate::errors::from_serde_json_error;
use crate::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::io::Read;

/// Type alias for label and annotation maps - string key-value pairs
pub type Labels = HashMap<String, String>;

/// Monitoring event carrying the metric points to forward
///
/// ## Example Usage
/// ```rust
/// use tyl_graphite_handler::Event;
///
/// let event = Event::from_json(r#"{
///     "timestamp": 2000,
///     "check": {"metadata": {"name": "disk"}},
///     "metrics": {"points": [{"name": "/", "value": 87.5, "timestamp": 1000}]}
/// }"#).unwrap();
///
/// assert!(event.has_metrics());
/// assert_eq!(event.check.name(), "disk");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event creation time (Unix epoch seconds)
    #[serde(default)]
    pub timestamp: i64,

    /// The monitored resource that produced the event
    #[serde(default, deserialize_with = "null_as_default")]
    pub entity: Entity,

    /// The probe that produced the event's metrics
    #[serde(default, deserialize_with = "null_as_default")]
    pub check: Check,

    /// Metric points, absent when the event carries no metrics
    #[serde(default)]
    pub metrics: Option<Metrics>,
}

impl Event {
    /// Parse an event from its JSON representation
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(from_serde_json_error)
    }

    /// Parse an event from any reader (typically stdin)
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(from_serde_json_error)
    }

    /// Whether the event carries at least one metric point
    pub fn has_metrics(&self) -> bool {
        !self.points().is_empty()
    }

    /// The metric points in the order they were reported
    pub fn points(&self) -> &[MetricPoint] {
        self.metrics
            .as_ref()
            .map(|metrics| metrics.points.as_slice())
            .unwrap_or_default()
    }
}

/// Object metadata shared by entities and checks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Labels,

    #[serde(default, deserialize_with = "null_as_default")]
    pub annotations: Labels,
}

/// The monitored resource (host/node) that produced the event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: ObjectMeta,
}

impl Entity {
    pub fn labels(&self) -> &Labels {
        &self.metadata.labels
    }

    pub fn annotations(&self) -> &Labels {
        &self.metadata.annotations
    }
}

/// The monitoring probe that produced the event's metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Check {
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: ObjectMeta,
}

impl Check {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn labels(&self) -> &Labels {
        &self.metadata.labels
    }

    pub fn annotations(&self) -> &Labels {
        &self.metadata.annotations
    }
}

/// Metrics container of an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default, deserialize_with = "null_as_default")]
    pub handlers: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub points: Vec<MetricPoint>,
}

/// One named, timestamped numeric measurement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub value: f64,

    #[serde(default)]
    pub timestamp: i64,

    /// Point tags; carried through deserialization but not used for naming
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<MetricTag>,
}

impl MetricPoint {
    pub fn new(name: impl Into<String>, value: f64, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp,
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTag {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// One record of the Graphite plaintext protocol
///
/// The value is kept in its final textual form so that point records
/// (`87.500000`) and the synthetic count record (`3`) share one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphiteRecord {
    pub name: String,
    pub value: String,
    pub timestamp: i64,
}

impl GraphiteRecord {
    pub fn new(name: impl Into<String>, value: impl Into<String>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            timestamp,
        }
    }

    /// Render the record as one newline-terminated protocol line
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl std::fmt::Display for GraphiteRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.name, self.value, self.timestamp)
    }
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
