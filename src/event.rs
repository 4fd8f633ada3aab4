//! The normalized event record every source extractor emits.
//!
//! An `Event` is an immutable fact from a third-party data export that
//! happened at a particular moment. Timestamps are normalized to epoch
//! seconds UTC at construction, whatever shape the source stored them in.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::SourceError;

/// A `{lat, lng}` pair attached to location-bearing events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Timestamp input as it appears in source records: a native date/time
/// value, integer seconds, or float seconds.
#[derive(Debug, Clone, Copy)]
pub enum TimeValue {
    Utc(DateTime<Utc>),
    Seconds(i64),
    Float(f64),
}

impl From<DateTime<Utc>> for TimeValue {
    fn from(dt: DateTime<Utc>) -> Self {
        TimeValue::Utc(dt)
    }
}

impl From<i64> for TimeValue {
    fn from(secs: i64) -> Self {
        TimeValue::Seconds(secs)
    }
}

impl From<f64> for TimeValue {
    fn from(secs: f64) -> Self {
        TimeValue::Float(secs)
    }
}

impl TimeValue {
    /// Coerce to finite epoch seconds. `None` when the value is NaN/infinite.
    pub fn epoch_seconds(self) -> Option<f64> {
        let secs = match self {
            TimeValue::Utc(dt) => dt.timestamp_millis() as f64 / 1000.0,
            TimeValue::Seconds(s) => s as f64,
            TimeValue::Float(f) => f,
        };
        secs.is_finite().then_some(secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// The third party this event originates from (e.g. "Facebook", "Google").
    pub company: String,
    /// The product/data source within the company (e.g. "Messenger", "Calendar").
    pub source: String,
    /// Event-type tag scoped to `source` (e.g. "friend_added", "email").
    pub key: String,
    /// Epoch seconds, UTC. Always finite.
    pub timestamp: f64,
    /// Fully rendered human-readable description.
    pub title: String,
    /// Optional raw payload (message body, email text, link target).
    pub content: Option<String>,
    /// Opaque attribute bag passed through from the source record.
    pub metadata: Option<serde_json::Value>,
    /// Entity names mentioned in or relevant to this event. Set semantics;
    /// serialized as a sorted array, though order is not contractual.
    pub names: BTreeSet<String>,
    pub location: Option<LatLng>,
}

impl Event {
    /// Build an event, normalizing the timestamp. Fails only when the
    /// timestamp cannot be coerced; `category` labels the failing rule.
    pub fn new(
        company: impl Into<String>,
        source: impl Into<String>,
        key: impl Into<String>,
        timestamp: impl Into<TimeValue>,
        title: impl Into<String>,
        category: &str,
    ) -> Result<Self, SourceError> {
        let value = timestamp.into();
        let secs = value
            .epoch_seconds()
            .ok_or_else(|| SourceError::Timestamp {
                category: category.to_string(),
                value: format!("{value:?}"),
            })?;
        Ok(Self {
            company: company.into(),
            source: source.into(),
            key: key.into(),
            timestamp: secs,
            title: title.into(),
            content: None,
            metadata: None,
            names: BTreeSet::new(),
            location: None,
        })
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn maybe_content(mut self, content: Option<String>) -> Self {
        self.content = content;
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn names(mut self, names: BTreeSet<String>) -> Self {
        self.names = names;
        self
    }

    pub fn location(mut self, lat: f64, lng: f64) -> Self {
        self.location = Some(LatLng { lat, lng });
        self
    }

    /// Flat serializable rendering, the shape consumed by query surfaces.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("event serialization is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_coerces_from_int_float_and_datetime() {
        let from_int = Event::new("C", "S", "k", 1_420_106_400i64, "t", "test").unwrap();
        let from_float = Event::new("C", "S", "k", 1_420_106_400.5f64, "t", "test").unwrap();
        let dt = Utc.with_ymd_and_hms(2015, 1, 1, 10, 0, 0).unwrap();
        let from_dt = Event::new("C", "S", "k", dt, "t", "test").unwrap();

        assert_eq!(from_int.timestamp, 1_420_106_400.0);
        assert_eq!(from_float.timestamp, 1_420_106_400.5);
        assert_eq!(from_dt.timestamp, 1_420_106_400.0);
        for ev in [&from_int, &from_float, &from_dt] {
            assert!(ev.timestamp.is_finite());
        }
    }

    #[test]
    fn non_finite_timestamp_is_rejected() {
        let err = Event::new("C", "S", "k", f64::NAN, "t", "friends").unwrap_err();
        match err {
            SourceError::Timestamp { category, .. } => assert_eq!(category, "friends"),
            other => panic!("expected Timestamp error, got {other:?}"),
        }
    }

    #[test]
    fn serializes_to_flat_shape() {
        let mut names = BTreeSet::new();
        names.insert("Bob Lee".to_string());
        let ev = Event::new("Google", "Email", "email", 100i64, "Email: hi", "email")
            .unwrap()
            .content("body")
            .metadata(serde_json::json!({"subject": "hi"}))
            .names(names)
            .location(37.87, -122.26);

        let v = ev.to_json();
        assert_eq!(v["company"], "Google");
        assert_eq!(v["source"], "Email");
        assert_eq!(v["key"], "email");
        assert_eq!(v["timestamp"], 100.0);
        assert_eq!(v["title"], "Email: hi");
        assert_eq!(v["content"], "body");
        assert_eq!(v["metadata"]["subject"], "hi");
        assert_eq!(v["names"], serde_json::json!(["Bob Lee"]));
        assert_eq!(v["location"]["lat"], 37.87);
        assert_eq!(v["location"]["lng"], -122.26);
    }
}
