//! Client configuration: where the server lives and where local state goes.
//!
//! Resolution order for the API base URL: `--api-url` flag, then the
//! `PMTERM_API_URL` environment variable, then `config.json` in the config
//! directory, then the default. The config directory defaults to `~/.pmterm`
//! and also holds the session cache.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Fallback base URL when nothing is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable overriding the configured base URL.
pub const API_URL_ENV: &str = "PMTERM_API_URL";

/// Persisted client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
}

impl Config {
    /// Load configuration from `config.json`, tolerating a missing or
    /// unreadable file.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join("config.json");
        if !path.exists() {
            return Config::default();
        }
        let mut buf = String::new();
        match File::open(&path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(cfg) => cfg,
                Err(e) => {
                    log::warn!("ignoring malformed config {}: {e}", path.display());
                    Config::default()
                }
            },
            Err(e) => {
                log::warn!("ignoring unreadable config {}: {e}", path.display());
                Config::default()
            }
        }
    }

    /// Save configuration using atomic write (temp file + rename).
    pub fn save(&self, dir: &Path) -> std::io::Result<()> {
        fs::create_dir_all(dir)?;
        let path = dir.join("config.json");
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self).expect("config serializes");
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }
}

/// The directory holding `config.json` and `session.json`.
pub fn config_dir(flag: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".pmterm")
}

/// Resolve the API base URL: flag first, then environment, then config
/// file, then the built-in default.
pub fn resolve_api_url(flag: Option<String>, dir: &Path) -> String {
    if let Some(url) = flag {
        return url;
    }
    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.is_empty() {
            return url;
        }
    }
    if let Some(url) = Config::load(dir).api_url {
        return url;
    }
    DEFAULT_API_URL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            api_url: Some("http://10.0.0.5:9000".to_string()),
        };
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path());
        assert_eq!(loaded.api_url.as_deref(), Some("http://10.0.0.5:9000"));
    }

    #[test]
    fn test_missing_config_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load(dir.path());
        assert!(loaded.api_url.is_none());
    }

    #[test]
    fn test_flag_beats_config() {
        let dir = tempfile::tempdir().unwrap();
        Config {
            api_url: Some("http://from-file".to_string()),
        }
        .save(dir.path())
        .unwrap();
        let url = resolve_api_url(Some("http://from-flag".to_string()), dir.path());
        assert_eq!(url, "http://from-flag");
    }
}
