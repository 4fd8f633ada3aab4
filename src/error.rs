//! Failure taxonomy for archive reads and record extraction.
//!
//! `NodeNotFound` is special: raised by direct adapter reads, but the generic
//! per-category accessor (`extract::load_category`) converts it into an empty
//! record sequence. Both call paths are part of the compatibility surface.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    /// Required archive path or record-array key absent.
    #[error("node not found in archive (path={path}, key={key})")]
    NodeNotFound { path: String, key: String },

    /// A record lacks a field the active rule treats as required.
    #[error("malformed record in `{category}`: missing or mistyped field `{field}`")]
    MalformedRecord { category: String, field: String },

    /// A timestamp value that cannot be coerced to finite epoch seconds.
    #[error("unusable timestamp in `{category}`: {value}")]
    Timestamp { category: String, value: String },

    /// A conversation-thread message with no recoverable participant list.
    /// Skipped locally by the thread pass; never escapes extraction.
    #[error("conversation thread has no participants: {0}")]
    ThreadWithoutParticipants(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A document that exists but is not valid JSON.
    #[error("invalid JSON document at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A container file (contact cards, calendar, mailbox) that its parser rejects.
    #[error("unreadable {kind} container at {}: {message}", path.display())]
    Container {
        kind: &'static str,
        path: PathBuf,
        message: String,
    },
}

impl SourceError {
    pub fn malformed(category: &str, field: &str) -> Self {
        Self::MalformedRecord {
            category: category.to_string(),
            field: field.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
