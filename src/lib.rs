// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod archive;
pub mod config;
pub mod directory;
pub mod error;
pub mod event;
pub mod extract;
pub mod storage;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{Aggregator, Summary};
pub use crate::archive::{MailAdapter, SocialAdapter, SourceAdapter};
pub use crate::config::Settings;
pub use crate::directory::{EntityDirectory, MentionPolicy};
pub use crate::error::SourceError;
pub use crate::event::{Event, LatLng, TimeValue};
pub use crate::extract::{extract_mail, extract_social};
