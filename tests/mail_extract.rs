// tests/mail_extract.rs
// Container-format categories: contact cards feeding the directory,
// calendar attendee cross-referencing, and mailbox extraction.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chronolens::extract::mail::build_directory;
use chronolens::{extract_mail, Event, MailAdapter};

const VCF: &str = "BEGIN:VCARD\r\n\
VERSION:3.0\r\n\
N:Lee;Bob;;;\r\n\
FN:Bob Lee\r\n\
EMAIL;TYPE=INTERNET:bob@y.com\r\n\
END:VCARD\r\n";

const ICS: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//fixture//EN\r\n\
BEGIN:VEVENT\r\n\
UID:evt-1\r\n\
DTSTART:20150101T100000Z\r\n\
DTEND:20150101T110000Z\r\n\
SUMMARY:Lunch planning\r\n\
ATTENDEE;CN=Bob Lee:mailto:bob@y.com\r\n\
ATTENDEE;CN=Stranger:mailto:stranger@z.com\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

const MBOX: &str = "From 1234@xxx Thu Jan 01 10:00:00 2015\n\
From: Bob Lee <bob@y.com>\n\
To: Me <me@x.com>\n\
Subject: Lunch\n\
Date: Thu, 1 Jan 2015 10:00:00 +0000\n\
\n\
See you at noon.\n\
From 1235@xxx Thu Jan 01 11:00:00 2015\n\
From: noreply@z.com\n\
To: Me <me@x.com>\n\
Subject: ?broken encoded subject\n\
Date: Thu, 1 Jan 2015 11:00:00 +0000\n\
\n\
unreadable\n";

fn fixture_archive() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "Contacts/All Contacts/All Contacts.vcf", VCF);
    write(root, "Calendar/Personal.ics", ICS);
    write(root, "Mail/All mail Including Spam and Trash.mbox", MBOX);
    dir
}

fn write(root: &Path, rel: &str, body: &str) {
    let full = root.join(rel);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, body).unwrap();
}

fn by_key<'a>(events: &'a [Event], key: &str) -> Vec<&'a Event> {
    events.iter().filter(|e| e.key == key).collect()
}

#[test]
fn contact_cards_build_the_literal_directory() {
    let dir = fixture_archive();
    let directory = build_directory(&MailAdapter::new(dir.path())).unwrap();
    // The structured N property keeps vCard component order: family first.
    assert_eq!(directory.name_for_email("bob@y.com"), Some("Lee Bob"));
    assert_eq!(directory.len(), 1);
}

#[test]
fn calendar_events_cross_reference_attendees_through_the_directory() {
    let dir = fixture_archive();
    let events = extract_mail(&MailAdapter::new(dir.path())).unwrap();

    let cal = by_key(&events, "event");
    assert_eq!(cal.len(), 1);
    assert_eq!(cal[0].title, "Calendar Event: Lunch planning");
    assert_eq!(cal[0].company, "Google");
    assert_eq!(cal[0].source, "Calendar");
    assert_eq!(cal[0].timestamp, 1_420_106_400.0);
    // Known attendee resolves; the stranger does not.
    assert_eq!(cal[0].names, BTreeSet::from(["Lee Bob".to_string()]));
    assert_eq!(cal[0].metadata.as_ref().unwrap()["SUMMARY"], "Lunch planning");
}

#[test]
fn emails_extract_with_literal_mentions_and_skip_undecoded_subjects() {
    let dir = fixture_archive();
    let events = extract_mail(&MailAdapter::new(dir.path())).unwrap();

    let mails = by_key(&events, "email");
    // The `?`-subject message is dropped.
    assert_eq!(mails.len(), 1);
    let mail = mails[0];
    assert_eq!(mail.title, "Email: Lunch");
    assert_eq!(mail.source, "Email");
    assert_eq!(mail.timestamp, 1_420_106_400.0);
    assert!(mail.content.as_deref().unwrap().contains("See you at noon."));
    // Literal policy: the address in the From header is a mention.
    assert_eq!(mail.names, BTreeSet::from(["Lee Bob".to_string()]));
    assert_eq!(mail.metadata.as_ref().unwrap()["subject"], "Lunch");
}

#[test]
fn mail_extraction_is_deterministic() {
    let dir = fixture_archive();
    let adapter = MailAdapter::new(dir.path());
    assert_eq!(
        extract_mail(&adapter).unwrap(),
        extract_mail(&adapter).unwrap()
    );
}
