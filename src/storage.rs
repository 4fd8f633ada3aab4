//! Interface boundary of the secure archive store collaborator.
//!
//! Encryption, compression, and blob transport live outside this crate;
//! the pipeline only assumes that whatever `get` returns, once decrypted
//! and unpacked, is laid out per the archive layout contract. What is
//! fixed here is the deterministic storage key and the allow-list of file
//! extensions an archive may contain.

use std::path::Path;

use sha2::{Digest, Sha256};

/// File extensions retained when packaging an export for upload.
pub const ARCHIVE_EXTENSIONS: [&str; 5] = [".json", ".csv", ".ics", ".vcf", ".mbox"];

/// Remote object store holding encrypted export archives, keyed per
/// `(user, company)` by [`storage_key`].
pub trait ArchiveStore {
    fn put(&self, company: &str, user_id: &str, bytes: &[u8]) -> anyhow::Result<()>;
    fn get(&self, company: &str, user_id: &str) -> anyhow::Result<Vec<u8>>;
}

/// Deterministic remote object name for one user's archive from one
/// company: SHA-256 over `user_id/<id>` then `company/<company>`, in that
/// order, truncated to 16 hex chars.
pub fn storage_key(company: &str, user_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("user_id/{user_id}").as_bytes());
    hasher.update(format!("company/{company}").as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..16].to_string()
}

/// Whether a file belongs in a packaged archive.
pub fn is_archived_extension(path: &Path) -> bool {
    let name = path.to_string_lossy();
    ARCHIVE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_is_deterministic_short_hex() {
        let a = storage_key("facebook", "shomil@berkeley.edu");
        let b = storage_key("facebook", "shomil@berkeley.edu");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn storage_key_varies_by_company_and_user() {
        let base = storage_key("facebook", "a@x.com");
        assert_ne!(base, storage_key("google", "a@x.com"));
        assert_ne!(base, storage_key("facebook", "b@x.com"));
    }

    #[test]
    fn extension_allow_list() {
        assert!(is_archived_extension(Path::new("friends/friends.json")));
        assert!(is_archived_extension(Path::new("Mail/All.mbox")));
        assert!(!is_archived_extension(Path::new("photos/img_001.jpg")));
    }
}
