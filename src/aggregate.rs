//! The merged in-memory timeline across sources.
//!
//! Sources are processed independently; their event lists meet only here.
//! The aggregator owns the merged collection, never the per-source lists.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::Settings;
use crate::event::Event;

/// Operator-facing report: how many events, and which kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub keys: BTreeSet<String>,
}

pub struct Aggregator {
    settings: Settings,
    events: Vec<Event>,
}

impl Aggregator {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            events: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Append one source's events, in source-processing order. No global
    /// time-sort happens at ingest time.
    pub fn ingest(&mut self, events: Vec<Event>) {
        self.events.extend(events);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Render the full collection as flat serializable records. `args` is
    /// accepted and ignored: no filtering, sorting, limiting, or
    /// aggregation happens here. Callers wanting a timeline sort the
    /// result by `timestamp` themselves.
    pub fn query(&self, _args: &Value) -> Vec<Value> {
        self.events.iter().map(Event::to_json).collect()
    }

    /// Count and distinct event keys. Never fails.
    pub fn summarize(&self) -> Summary {
        let keys: BTreeSet<String> = self.events.iter().map(|e| e.key.clone()).collect();
        let summary = Summary {
            total: self.events.len(),
            keys,
        };
        info!(
            total = summary.total,
            kinds = summary.keys.len(),
            "timeline summary"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ev(key: &str, ts: i64) -> Event {
        Event::new("C", "S", key, ts, format!("{key} at {ts}"), "test").unwrap()
    }

    #[test]
    fn query_is_a_passthrough_that_ignores_args() {
        let mut agg = Aggregator::new(Settings::default());
        agg.ingest(vec![ev("b", 200), ev("a", 100)]);

        let everything = agg.query(&json!({}));
        let filtered = agg.query(&json!({"key": "a", "limit": 1, "sort": "timestamp"}));
        assert_eq!(everything, filtered);
        assert_eq!(everything.len(), 2);
        // Ingest order, not time order.
        assert_eq!(everything[0]["key"], "b");
        assert_eq!(everything[1]["key"], "a");
    }

    #[test]
    fn summarize_reports_count_and_distinct_keys() {
        let mut agg = Aggregator::new(Settings::default());
        agg.ingest(vec![ev("a", 1), ev("a", 2), ev("b", 3)]);
        let summary = agg.summarize();
        assert_eq!(summary.total, 3);
        assert_eq!(
            summary.keys,
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn summarize_on_empty_aggregator_is_fine() {
        let agg = Aggregator::new(Settings::default());
        let summary = agg.summarize();
        assert_eq!(summary.total, 0);
        assert!(summary.keys.is_empty());
    }
}
