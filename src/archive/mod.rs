//! Uniform read access to one company's decrypted export archive on disk.
//!
//! An adapter exposes three capabilities: locator discovery by extension
//! (`enumerate`), keyed record-array reads from the JSON document tree
//! (`read_record_array`), and whole-document reads (`read_raw`). The two
//! variants share no state; each privately owns its archive root.

pub mod mail;
pub mod social;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::warn;

use crate::error::{Result, SourceError};

pub use mail::{CalendarEntry, ContactCard, MailAdapter, MailMessage};
pub use social::SocialAdapter;

pub trait SourceAdapter {
    /// The data holder this adapter reads for (fixed per instance).
    fn company(&self) -> &'static str;

    /// Archive root on local storage.
    fn root(&self) -> &Path;

    /// Recursive discovery of files matching `**/*<suffix>` under the root.
    /// Never fails: an unreadable root or a bad pattern logs a warning and
    /// yields nothing; an empty result is valid.
    fn enumerate(&self, suffix: &str) -> Vec<PathBuf> {
        glob_suffix(self.root(), suffix)
    }

    /// The record array stored under top-level `key` in the JSON document at
    /// `<root>/<path>`. `NodeNotFound` when the document or the key is
    /// absent; either condition aborts a direct caller's pass.
    fn read_record_array(&self, path: &str, key: &str) -> Result<Vec<Value>>;

    /// The whole JSON document at an enumerated locator.
    fn read_raw(&self, locator: &Path) -> Result<Value>;
}

pub(crate) fn glob_suffix(root: &Path, suffix: &str) -> Vec<PathBuf> {
    let pattern = format!("{}/**/*{}", root.display(), suffix);
    let paths = match glob::glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "invalid enumerate pattern");
            return Vec::new();
        }
    };
    let mut found: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(error = %e, "unreadable path during enumerate");
                None
            }
        })
        .collect();
    found.sort();
    found
}

/// Shared JSON-document-tree read used by both adapter variants.
pub(crate) fn read_json_node(root: &Path, path: &str, key: &str) -> Result<Vec<Value>> {
    let full = root.join(path);
    if !full.exists() {
        return Err(SourceError::NodeNotFound {
            path: path.to_string(),
            key: key.to_string(),
        });
    }
    let doc = read_json_document(&full)?;
    match doc.get(key) {
        Some(Value::Array(rows)) => Ok(rows.clone()),
        // Keyed-dispatch nodes store an object; hand it back as one record.
        Some(other @ Value::Object(_)) => Ok(vec![other.clone()]),
        _ => Err(SourceError::NodeNotFound {
            path: path.to_string(),
            key: key.to_string(),
        }),
    }
}

pub(crate) fn read_json_document(full: &Path) -> Result<Value> {
    let data = fs::read_to_string(full)?;
    serde_json::from_str(&data).map_err(|source| SourceError::Json {
        path: full.to_path_buf(),
        source,
    })
}
