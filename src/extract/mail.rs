//! Category rules for the webmail/calendar/contacts export.
//!
//! Contacts are a directory-only category; calendar and email both resolve
//! mentions, so the directory must exist before either runs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::json;
use tracing::{info, warn};

use crate::archive::{MailAdapter, SourceAdapter};
use crate::directory::{EntityDirectory, MentionPolicy};
use crate::error::{Result, SourceError};
use crate::event::Event;

/// Extract everything the mail archive holds. The contact directory is
/// built first; that ordering is a precondition of the calendar and email
/// passes, both of which cross-reference it.
pub fn extract_mail(adapter: &MailAdapter) -> Result<Vec<Event>> {
    let directory = build_directory(adapter)?;
    info!(
        company = adapter.company(),
        directory = directory.len(),
        "entity directory built"
    );

    let mut events = Vec::new();
    extract_calendar(adapter, &directory, &mut events)?;
    extract_email(adapter, &directory, &mut events)?;

    info!(
        company = adapter.company(),
        events = events.len(),
        "mail extraction complete"
    );
    Ok(events)
}

/// Directory entries come from every contact card in the archive. A card
/// without a structured name is skipped; a named card without an email is
/// malformed (the email is what calendar cross-referencing keys on).
pub fn build_directory(adapter: &MailAdapter) -> Result<EntityDirectory> {
    let mut directory = EntityDirectory::new(MentionPolicy::Literal);
    for path in adapter.enumerate(".vcf") {
        for card in adapter.contacts(&path)? {
            let Some(name) = card.name else {
                continue;
            };
            let email = card
                .email
                .ok_or_else(|| SourceError::malformed("contacts", "EMAIL"))?;
            directory.insert(clean_name(&name), Some(email));
        }
    }
    Ok(directory)
}

fn extract_calendar(
    adapter: &MailAdapter,
    directory: &EntityDirectory,
    events: &mut Vec<Event>,
) -> Result<()> {
    for path in adapter.enumerate(".ics") {
        for entry in adapter.calendar(&path)? {
            let dtstart = entry
                .dtstart
                .as_deref()
                .ok_or_else(|| SourceError::malformed("calendar", "DTSTART"))?;
            let start = parse_ical_timestamp(dtstart).ok_or_else(|| SourceError::Timestamp {
                category: "calendar".to_string(),
                value: dtstart.to_string(),
            })?;
            let summary = entry.summary.as_deref().unwrap_or("[untitled]");

            let mut names = std::collections::BTreeSet::new();
            for email in &entry.attendee_emails {
                if let Some(name) = directory.name_for_email(email) {
                    names.insert(name.to_string());
                }
            }

            let ev = Event::new(
                adapter.company(),
                "Calendar",
                "event",
                start,
                format!("Calendar Event: {summary}"),
                "calendar",
            )?
            .metadata(serde_json::Value::Object(entry.properties.clone()))
            .names(names);
            events.push(ev);
        }
    }
    Ok(())
}

fn extract_email(
    adapter: &MailAdapter,
    directory: &EntityDirectory,
    events: &mut Vec<Event>,
) -> Result<()> {
    for path in adapter.enumerate(".mbox") {
        let mut skipped = 0usize;
        for message in adapter.messages(&path)? {
            let subject = message.subject.as_deref().unwrap_or("(no subject)");
            // Encoded-word leftovers; the original archive tooling dropped these.
            if subject.starts_with('?') {
                skipped += 1;
                continue;
            }
            let date = message
                .date
                .ok_or_else(|| SourceError::malformed("email", "Date"))?;

            let metadata = json!({
                "subject": subject,
                "from": message.from,
                "to": message.to,
                "timestamp": date,
            });
            let haystack = format!(
                "{} {}",
                metadata,
                message.body.as_deref().unwrap_or_default()
            );
            let names = directory.resolve(&haystack);

            let ev = Event::new(
                adapter.company(),
                "Email",
                "email",
                date,
                format!("Email: {subject}"),
                "email",
            )?
            .maybe_content(message.body.clone())
            .metadata(metadata)
            .names(names);
            events.push(ev);
        }
        if skipped > 0 {
            warn!(path = %path.display(), skipped, "dropped messages with undecoded subjects");
        }
    }
    Ok(())
}

/// Collapse runs of spaces inside contact display names.
fn clean_name(name: &str) -> String {
    static RE_SPACES: OnceCell<Regex> = OnceCell::new();
    let re = RE_SPACES.get_or_init(|| Regex::new(" +").unwrap());
    re.replace_all(name, " ").trim().to_string()
}

/// `DTSTART` values: `yyyymmddThhmmss` with optional trailing `Z`, or the
/// all-day form `yyyymmdd`. Naive values are read as UTC.
fn parse_ical_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    let bare = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    if let Ok(naive) = NaiveDateTime::parse_from_str(bare, "%Y%m%dT%H%M%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    let date = NaiveDate::parse_from_str(bare, "%Y%m%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_name_collapses_spaces() {
        assert_eq!(clean_name("  Lee   Bob "), "Lee Bob");
    }

    #[test]
    fn ical_timestamps_parse_in_all_forms() {
        let utc = parse_ical_timestamp("20150101T100000Z").unwrap();
        assert_eq!(utc.timestamp(), 1_420_106_400);
        let naive = parse_ical_timestamp("20150101T100000").unwrap();
        assert_eq!(naive, utc);
        let all_day = parse_ical_timestamp("20150101").unwrap();
        assert_eq!(all_day.timestamp(), 1_420_070_400);
        assert!(parse_ical_timestamp("next tuesday").is_none());
    }
}
