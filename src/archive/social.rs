//! Adapter over a social-network export: a tree of keyed JSON documents,
//! one category per document, each holding a named top-level record array.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{read_json_document, read_json_node, SourceAdapter};
use crate::error::Result;

pub struct SocialAdapter {
    root: PathBuf,
}

impl SocialAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceAdapter for SocialAdapter {
    fn company(&self) -> &'static str {
        "Facebook"
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
