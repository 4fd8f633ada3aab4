//! Adapter over a webmail/calendar/contacts export: typed container files
//! discovered by extension, plus the same keyed-JSON-document capabilities
//! as the social variant.
//!
//! Container internals are delegated: vCard and iCalendar objects to the
//! `ical` crate, RFC 2822 messages to `mail-parser`. This module only splits
//! the mbox container on its `From ` separator lines and flattens the
//! parsed structures into company-neutral records.

use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

use super::{read_json_document, read_json_node, SourceAdapter};
use crate::error::{Result, SourceError};

/// One contact card. `name` is the `N` property's non-empty components in
/// vCard order, space-joined; `email` is the first `EMAIL` property.
#[derive(Debug, Clone)]
pub struct ContactCard {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// One VEVENT, flattened to its property map plus the fields the extractor
/// keys on. Attendee values have their `mailto:` prefix stripped.
#[derive(Debug, Clone)]
pub struct CalendarEntry {
    pub summary: Option<String>,
    pub dtstart: Option<String>,
    pub attendee_emails: Vec<String>,
    pub properties: Map<String, Value>,
}

/// One mailbox message, already decoded by the message parser.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub subject: Option<String>,
    pub from: String,
    pub to: String,
    /// Epoch seconds from the `Date` header, when present.
    pub date: Option<i64>,
    pub body: Option<String>,
}

pub struct MailAdapter {
    root: PathBuf,
}

impl MailAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// All contact cards in one `.vcf` file.
    pub fn contacts(&self, path: &Path) -> Result<Vec<ContactCard>> {
        let reader = BufReader::new(File::open(path)?);
        let mut cards = Vec::new();
        for parsed in ical::VcardParser::new(reader) {
            let contact = parsed.map_err(|e| SourceError::Container {
                kind: "vcard",
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            let mut name = None;
            let mut email = None;
            for prop in &contact.properties {
                match prop.name.as_str() {
                    "N" if name.is_none() => {
                        name = prop.value.as_deref().map(join_structured_name);
                    }
                    "EMAIL" if email.is_none() => {
                        email = prop.value.clone();
                    }
                    _ => {}
                }
            }
            cards.push(ContactCard {
                name: name.filter(|n| !n.is_empty()),
                email,
            });
        }
        Ok(cards)
    }

    /// All VEVENTs in one `.ics` file.
    pub fn calendar(&self, path: &Path) -> Result<Vec<CalendarEntry>> {
        let reader = BufReader::new(File::open(path)?);
        let mut entries = Vec::new();
        for parsed in ical::IcalParser::new(reader) {
            let calendar = parsed.map_err(|e| SourceError::Container {
                kind: "ical",
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            for event in &calendar.events {
                let mut entry = CalendarEntry {
                    summary: None,
                    dtstart: None,
                    attendee_emails: Vec::new(),
                    properties: Map::new(),
                };
                for prop in &event.properties {
                    let value = prop.value.clone().unwrap_or_default();
                    match prop.name.as_str() {
                        "SUMMARY" => entry.summary = prop.value.clone(),
                        "DTSTART" => entry.dtstart = prop.value.clone(),
                        "ATTENDEE" => {
                            let email = value
                                .strip_prefix("mailto:")
                                .or_else(|| value.strip_prefix("MAILTO:"))
                                .unwrap_or(&value);
                            entry.attendee_emails.push(email.to_string());
                        }
                        _ => {}
                    }
                    entry
                        .properties
                        .insert(prop.name.clone(), Value::String(value));
                }
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// All messages in one `.mbox` file. A message the parser cannot decode
    /// at all is logged and skipped; the scan runs to completion.
    pub fn messages(&self, path: &Path) -> Result<Vec<MailMessage>> {
        let raw = fs::read_to_string(path)?;
        let parser = mail_parser::MessageParser::default();
        let mut messages = Vec::new();
        for chunk in split_mbox(&raw) {
            let Some(parsed) = parser.parse(chunk.as_bytes()) else {
                warn!(path = %path.display(), "skipping undecodable mailbox message");
                continue;
            };
            messages.push(MailMessage {
                subject: parsed.subject().map(str::to_string),
                from: render_addresses(parsed.from()),
                to: render_addresses(parsed.to()),
                date: parsed.date().map(|d| d.to_timestamp()),
                body: parsed.body_text(0).map(|b| b.into_owned()),
            });
        }
        Ok(messages)
    }
}

impl SourceAdapter for MailAdapter {
    fn company(&self) -> &'static str {
        "Google"
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn read_record_array(&self, path: &str, key: &str) -> Result<Vec<Value>> {
        read_json_node(&self.root, path, key)
    }

    fn read_raw(&self, locator: &Path) -> Result<Value> {
        read_json_document(locator)
    }
}

/// `N:Lee;Bob;;;` → `Lee Bob`. Components keep their vCard order.
fn join_structured_name(value: &str) -> String {
    value
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split an mbox into per-message chunks on `From ` separator lines. The
/// separator line itself is not part of the message.
fn split_mbox(raw: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_message = false;
    for line in raw.lines() {
        if line.starts_with("From ") {
            if in_message && !current.trim().is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.clear();
            in_message = true;
            continue;
        }
        if in_message {
            current.push_str(line);
            current.push('\n');
        }
    }
    if in_message && !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

fn render_addresses(address: Option<&mail_parser::Address<'_>>) -> String {
    let Some(address) = address else {
        return String::new();
    };
    let mut parts = Vec::new();
    for addr in address.iter() {
        match (addr.name.as_deref(), addr.address.as_deref()) {
            (Some(name), Some(email)) => parts.push(format!("{name} <{email}>")),
            (None, Some(email)) => parts.push(email.to_string()),
            (Some(name), None) => parts.push(name.to_string()),
            (None, None) => {}
        }
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_name_joins_nonempty_components() {
        assert_eq!(join_structured_name("Lee;Bob;;;"), "Lee Bob");
        assert_eq!(join_structured_name(";;Q;;"), "Q");
        assert_eq!(join_structured_name(";;;;"), "");
    }

    #[test]
    fn mbox_splits_on_separator_lines() {
        let raw = "From 123@xxx Thu Jan 01 00:00:00 2015\n\
                   Subject: one\n\n\
                   body one\n\
                   From 456@xxx Thu Jan 02 00:00:00 2015\n\
                   Subject: two\n\n\
                   body two\n";
        let chunks = split_mbox(raw);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("Subject: one"));
        assert!(!chunks[0].contains("Subject: two"));
        assert!(chunks[1].contains("body two"));
    }

    #[test]
    fn mbox_without_separators_yields_nothing() {
        assert!(split_mbox("just some text\n").is_empty());
    }
}
