//! Category rules: the mapping definitions from archive record categories
//! to normalized events, plus the generic machinery that interprets them.
//!
//! Each rule is a declarative table entry; the runners below iterate the
//! tables so no category needs a bespoke procedure. Rules are stateless
//! apart from reading the source's entity directory, which callers must
//! build before any mention-resolving rule runs.

pub mod mail;
pub mod social;

pub use mail::extract_mail;
pub use social::extract_social;

use serde_json::Value;
use tracing::debug;

use crate::archive::SourceAdapter;
use crate::directory::EntityDirectory;
use crate::error::{Result, SourceError};
use crate::event::{Event, TimeValue};

/// Generic per-category accessor. A category absent from the archive (no
/// document, or no such key in the document) is an empty record sequence
/// here; every other failure propagates. Direct `read_record_array` calls
/// keep the raising behavior.
pub fn load_category(adapter: &dyn SourceAdapter, path: &str, key: &str) -> Result<Vec<Value>> {
    match adapter.read_record_array(path, key) {
        Ok(rows) => Ok(rows),
        Err(SourceError::NodeNotFound { .. }) => {
            debug!(path, key, "category absent from archive, no records");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

// --- rule shapes ---

pub(crate) enum TitleSpec {
    /// The record's own field is the finished title.
    Field(&'static str),
    /// Fixed prefix followed by a record field.
    Prefixed {
        prefix: &'static str,
        field: &'static str,
    },
    /// Anything else (multi-field titles, documented fallbacks).
    Build(fn(&Value) -> Result<String>),
}

pub(crate) enum MetadataSpec {
    None,
    /// The whole record passes through.
    Record,
    /// A sub-object of the record; `required` mirrors whether the original
    /// schema treats its absence as malformed.
    Field {
        field: &'static str,
        required: bool,
    },
}

/// One record → one event.
pub(crate) struct DirectRule {
    pub source: &'static str,
    pub key: &'static str,
    pub path: &'static str,
    pub node: &'static str,
    pub timestamp_field: &'static str,
    pub title: TitleSpec,
    pub metadata: MetadataSpec,
    /// Required when present (the category schema guarantees the field).
    pub content_field: Option<&'static str>,
    /// Object field holding `latitude`/`longitude`, required when present.
    pub location_field: Option<&'static str>,
    /// Resolve mentions over the serialized record.
    pub mentions: bool,
}

/// Record array of `{name, entries[]}` rows; only rows whose `name` matches
/// a configured label emit, one event per entry with the label's prefix.
pub(crate) struct LabeledDispatchRule {
    pub source: &'static str,
    pub path: &'static str,
    pub node: &'static str,
    pub options: &'static [LabeledOption],
}

pub(crate) struct LabeledOption {
    pub label: &'static str,
    pub key: &'static str,
    pub title_prefix: &'static str,
}

/// Document node that is an object keyed by category name; each configured
/// key maps its array with its own prefix. Unconfigured or absent keys are
/// silently ignored.
pub(crate) struct KeyedDispatchRule {
    pub source: &'static str,
    pub key: &'static str,
    pub path: &'static str,
    pub node: &'static str,
    pub timestamp_field: &'static str,
    pub options: &'static [(&'static str, &'static str)],
}

/// Outer array of groups, each holding an optional inner array of
/// sub-records; the group's name is interpolated into every inner title.
pub(crate) struct GroupedRule {
    pub source: &'static str,
    pub key: &'static str,
    pub path: &'static str,
    pub node: &'static str,
    pub inner_key: &'static str,
    pub title: fn(group_name: &str, inner: &Value) -> Result<String>,
}

// --- rule runners ---

pub(crate) fn run_direct(
    adapter: &dyn SourceAdapter,
    rule: &DirectRule,
    directory: &EntityDirectory,
    events: &mut Vec<Event>,
) -> Result<()> {
    for row in load_category(adapter, rule.path, rule.node)? {
        let ts = req_time(&row, rule.node, rule.timestamp_field)?;
        let title = render_title(&rule.title, &row, rule.node)?;
        let mut ev = Event::new(
            adapter.company(),
            rule.source,
            rule.key,
            ts,
            title,
            rule.node,
        )?;
        match rule.metadata {
            MetadataSpec::None => {}
            MetadataSpec::Record => ev = ev.metadata(row.clone()),
            MetadataSpec::Field { field, required } => match row.get(field) {
                Some(value) => ev = ev.metadata(value.clone()),
                None if required => return Err(SourceError::malformed(rule.node, field)),
                None => {}
            },
        }
        if let Some(field) = rule.content_field {
            ev = ev.content(req_str(&row, rule.node, field)?);
        }
        if let Some(field) = rule.location_field {
            let coord = row
                .get(field)
                .ok_or_else(|| SourceError::malformed(rule.node, field))?;
            let lat = req_f64(coord, rule.node, "latitude")?;
            let lng = req_f64(coord, rule.node, "longitude")?;
            ev = ev.location(lat, lng);
        }
        if rule.mentions {
            ev = ev.names(directory.resolve(&row.to_string()));
        }
        events.push(ev);
    }
    Ok(())
}

pub(crate) fn run_labeled_dispatch(
    adapter: &dyn SourceAdapter,
    rule: &LabeledDispatchRule,
    directory: &EntityDirectory,
    events: &mut Vec<Event>,
) -> Result<()> {
    for row in load_category(adapter, rule.path, rule.node)? {
        let row_name = req_str(&row, rule.node, "name")?;
        let Some(option) = rule.options.iter().find(|o| o.label == row_name) else {
            continue;
        };
        let entries = row
            .get("entries")
            .and_then(Value::as_array)
            .ok_or_else(|| SourceError::malformed(rule.node, "entries"))?;
        for entry in entries {
            let ts = req_time(entry, rule.node, "timestamp")?;
            let data = entry
                .get("data")
                .ok_or_else(|| SourceError::malformed(rule.node, "data"))?;
            let subject = req_str(data, rule.node, "name")?;
            let ev = Event::new(
                adapter.company(),
                rule.source,
                option.key,
                ts,
                format!("{}{subject}", option.title_prefix),
                rule.node,
            )?
            .metadata(data.clone())
            .names(directory.resolve(subject));
            events.push(ev);
        }
    }
    Ok(())
}

pub(crate) fn run_keyed_dispatch(
    adapter: &dyn SourceAdapter,
    rule: &KeyedDispatchRule,
    events: &mut Vec<Event>,
) -> Result<()> {
    for doc in load_category(adapter, rule.path, rule.node)? {
        for (entry_key, prefix) in rule.options {
            let Some(rows) = doc.get(*entry_key).and_then(Value::as_array) else {
                continue;
            };
            for row in rows {
                let ts = req_time(row, rule.node, rule.timestamp_field)?;
                let name = req_str(row, rule.node, "name")?;
                let ev = Event::new(
                    adapter.company(),
                    rule.source,
                    rule.key,
                    ts,
                    format!("{prefix}{name}"),
                    rule.node,
                )?
                .metadata(row.clone());
                events.push(ev);
            }
        }
    }
    Ok(())
}

pub(crate) fn run_grouped(
    adapter: &dyn SourceAdapter,
    rule: &GroupedRule,
    events: &mut Vec<Event>,
) -> Result<()> {
    for group in load_category(adapter, rule.path, rule.node)? {
        let group_name = req_str(&group, rule.node, "name")?.to_string();
        let inner = group
            .get(rule.inner_key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for record in inner {
            let ts = req_time(&record, rule.node, "timestamp")?;
            let title = (rule.title)(&group_name, &record)?;
            let ev = Event::new(adapter.company(), rule.source, rule.key, ts, title, rule.node)?
                .metadata(record.clone());
            events.push(ev);
        }
    }
    Ok(())
}

// --- field access ---

pub(crate) fn render_title(spec: &TitleSpec, row: &Value, category: &str) -> Result<String> {
    match spec {
        TitleSpec::Field(field) => Ok(req_str(row, category, field)?.to_string()),
        TitleSpec::Prefixed { prefix, field } => {
            Ok(format!("{prefix}{}", req_str(row, category, field)?))
        }
        TitleSpec::Build(build) => build(row),
    }
}

pub(crate) fn req_str<'a>(row: &'a Value, category: &str, field: &str) -> Result<&'a str> {
    row.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| SourceError::malformed(category, field))
}

pub(crate) fn req_f64(row: &Value, category: &str, field: &str) -> Result<f64> {
    row.get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| SourceError::malformed(category, field))
}

/// A record timestamp field: integer or float epoch seconds.
pub(crate) fn req_time(row: &Value, category: &str, field: &str) -> Result<TimeValue> {
    let value = row
        .get(field)
        .ok_or_else(|| SourceError::malformed(category, field))?;
    if let Some(secs) = value.as_i64() {
        return Ok(TimeValue::from(secs));
    }
    value
        .as_f64()
        .map(TimeValue::from)
        .ok_or_else(|| SourceError::Timestamp {
            category: category.to_string(),
            value: value.to_string(),
        })
}
