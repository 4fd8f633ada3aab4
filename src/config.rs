//! Pipeline settings. Supports TOML or JSON files, resolved via an env-var
//! override with fixed fallback paths.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

const ENV_PATH: &str = "CHRONOLENS_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// The archive owner's display name, used to disambiguate message
    /// direction in conversation threads.
    #[serde(default)]
    pub full_name: Option<String>,

    /// Root of the decrypted social-network archive.
    #[serde(default)]
    pub social_root: Option<PathBuf>,

    /// Root of the decrypted mail/calendar/contacts archive.
    #[serde(default)]
    pub mail_root: Option<PathBuf>,

    /// Anything else in the file rides along untouched; downstream query
    /// surfaces read what they need out of this bag.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Settings {
    /// Load settings from an explicit path. TOML or JSON by extension,
    /// with a parse-sniffing fallback for files without a useful one.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_settings(&content, &ext)
            .with_context(|| format!("parsing settings from {}", path.display()))
    }

    /// Resolve settings using the env var + fallbacks:
    /// 1) $CHRONOLENS_CONFIG_PATH
    /// 2) config/chronolens.toml
    /// 3) config/chronolens.json
    /// No file at all yields defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_PATH} points to a non-existent path"));
        }
        for candidate in ["config/chronolens.toml", "config/chronolens.json"] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Ok(Self::default())
    }
}

fn parse_settings(content: &str, hint_ext: &str) -> Result<Settings> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(content)?);
    }
    if hint_ext == "toml" {
        return Ok(toml::from_str(content)?);
    }
    if let Ok(s) = toml::from_str(content) {
        return Ok(s);
    }
    serde_json::from_str(content).map_err(|_| anyhow!("unsupported settings format"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_both_parse() {
        let toml_cfg: Settings = parse_settings(
            "full_name = \"Alice Smith\"\nsocial_root = \"/data/facebook\"\n",
            "toml",
        )
        .unwrap();
        assert_eq!(toml_cfg.full_name.as_deref(), Some("Alice Smith"));
        assert_eq!(
            toml_cfg.social_root.as_deref(),
            Some(Path::new("/data/facebook"))
        );

        let json_cfg: Settings =
            parse_settings(r#"{"full_name": "Alice Smith", "mail_root": "/data/google"}"#, "json")
                .unwrap();
        assert_eq!(json_cfg.full_name.as_deref(), Some("Alice Smith"));
        assert_eq!(
            json_cfg.mail_root.as_deref(),
            Some(Path::new("/data/google"))
        );
    }

    #[test]
    fn unknown_keys_land_in_the_extra_bag() {
        let cfg: Settings =
            parse_settings(r#"{"full_name": "A", "index_depth": 3}"#, "json").unwrap();
        assert_eq!(cfg.extra.get("index_depth"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn missing_fields_default_to_none() {
        let cfg: Settings = parse_settings("{}", "json").unwrap();
        assert!(cfg.full_name.is_none());
        assert!(cfg.social_root.is_none());
        assert!(cfg.mail_root.is_none());
        assert!(cfg.extra.is_empty());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD in a temp dir so a real config/ in the repo can't interfere.
        let old = std::env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        std::env::set_current_dir(tmp.path()).unwrap();

        std::env::remove_var(ENV_PATH);

        // No files in the temp CWD: defaults.
        let cfg = Settings::load_default().unwrap();
        assert!(cfg.full_name.is_none());

        // The env var wins over fallback paths.
        let fallback = tmp.path().join("config");
        std::fs::create_dir_all(&fallback).unwrap();
        std::fs::write(
            fallback.join("chronolens.toml"),
            "full_name = \"Fallback\"\n",
        )
        .unwrap();
        let p_json = tmp.path().join("override.json");
        std::fs::write(&p_json, r#"{"full_name": "From Env"}"#).unwrap();
        std::env::set_var(ENV_PATH, p_json.display().to_string());
        let cfg = Settings::load_default().unwrap();
        assert_eq!(cfg.full_name.as_deref(), Some("From Env"));

        // Without the env var, the fallback file is found.
        std::env::remove_var(ENV_PATH);
        let cfg = Settings::load_default().unwrap();
        assert_eq!(cfg.full_name.as_deref(), Some("Fallback"));

        std::env::set_current_dir(&old).unwrap();
    }
}
