//! Per-source registry of known people, used for mention resolution.
//!
//! A directory is built once at the start of a source's extraction pass,
//! from that source's own friend/contact records, and is read-only while
//! the category rules run. It is discarded with the pass; nothing persists.

use std::collections::BTreeSet;

/// How a directory decides that a name is mentioned in a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionPolicy {
    /// Social policy: the text case-insensitively contains the full name,
    /// or the first whitespace-delimited token of the name. Permissive on
    /// purpose; common first names produce false positives. Compatibility
    /// contract, do not tighten.
    FirstToken,
    /// Mail/calendar policy: the text contains the literal full name or the
    /// literal email address, case-sensitively.
    Literal,
}

#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug)]
pub struct EntityDirectory {
    policy: MentionPolicy,
    entries: Vec<DirectoryEntry>,
}

impl EntityDirectory {
    pub fn new(policy: MentionPolicy) -> Self {
        Self {
            policy,
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, email: Option<String>) {
        let name = name.into();
        if name.is_empty() {
            return;
        }
        // Same person exported twice (e.g. friends + removed_friends) is one entry.
        if self
            .entries
            .iter()
            .any(|e| e.name == name && e.email == email)
        {
            return;
        }
        self.entries.push(DirectoryEntry { name, email });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Reverse lookup used by calendar attendee cross-referencing.
    pub fn name_for_email(&self, email: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.email.as_deref() == Some(email))
            .map(|e| e.name.as_str())
    }

    /// The set of directory names mentioned in `text`. Empty text or an
    /// empty directory yields the empty set; never fails.
    pub fn resolve(&self, text: &str) -> BTreeSet<String> {
        let mut mentioned = BTreeSet::new();
        if text.is_empty() || self.entries.is_empty() {
            return mentioned;
        }
        let lowered = match self.policy {
            MentionPolicy::FirstToken => Some(text.to_lowercase()),
            MentionPolicy::Literal => None,
        };
        for entry in &self.entries {
            let hit = match self.policy {
                MentionPolicy::FirstToken => {
                    let haystack = lowered.as_deref().unwrap_or_default();
                    let full = entry.name.to_lowercase();
                    let first = full.split_whitespace().next().unwrap_or_default();
                    haystack.contains(&full) || (!first.is_empty() && haystack.contains(first))
                }
                MentionPolicy::Literal => {
                    text.contains(entry.name.as_str())
                        || entry
                            .email
                            .as_deref()
                            .is_some_and(|email| text.contains(email))
                }
            };
            if hit {
                mentioned.insert(entry.name.clone());
            }
        }
        mentioned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn social_dir() -> EntityDirectory {
        let mut d = EntityDirectory::new(MentionPolicy::FirstToken);
        d.insert("Alice Smith", None);
        d
    }

    fn mail_dir() -> EntityDirectory {
        let mut d = EntityDirectory::new(MentionPolicy::Literal);
        d.insert("Bob Lee", Some("bob@y.com".to_string()));
        d
    }

    #[test]
    fn first_token_policy_matches_first_name_case_insensitively() {
        let d = social_dir();
        assert_eq!(
            d.resolve("hi Alice, how are you"),
            BTreeSet::from(["Alice Smith".to_string()])
        );
        assert!(d.resolve("no mention here").is_empty());
    }

    #[test]
    fn first_token_policy_matches_full_name() {
        let d = social_dir();
        assert_eq!(
            d.resolve("met ALICE SMITH yesterday"),
            BTreeSet::from(["Alice Smith".to_string()])
        );
    }

    #[test]
    fn literal_policy_matches_email_but_not_partial_name() {
        let d = mail_dir();
        assert_eq!(
            d.resolve("forwarded to bob@y.com for review"),
            BTreeSet::from(["Bob Lee".to_string()])
        );
        // "bob" alone is not a literal full-name or email match.
        assert!(d.resolve("bob said hi").is_empty());
        // Literal policy is case-sensitive.
        assert!(d.resolve("BOB LEE").is_empty());
    }

    #[test]
    fn empty_inputs_yield_empty_set() {
        let d = social_dir();
        assert!(d.resolve("").is_empty());
        let empty = EntityDirectory::new(MentionPolicy::Literal);
        assert!(empty.resolve("Bob Lee bob@y.com").is_empty());
    }

    #[test]
    fn duplicate_inserts_collapse() {
        let mut d = social_dir();
        d.insert("Alice Smith", None);
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn email_reverse_lookup() {
        let d = mail_dir();
        assert_eq!(d.name_for_email("bob@y.com"), Some("Bob Lee"));
        assert_eq!(d.name_for_email("nobody@z.com"), None);
    }
}
