use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use url::Url;

/// Runtime configuration: an optional TOML file overlaid with `APERTURE_*`
/// environment variables. Every field has a workable default so the CLI
/// runs with no setup against a local backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the remote content backend (edge function root).
    pub backend_url: String,
    /// Cache database URL; defaults to a SQLite file in the user data dir.
    pub database_url: Option<String>,
    /// Bind address for `serve`.
    pub bind: String,
    /// Shared secret for the revalidation endpoint. Unset means the
    /// endpoint rejects every request.
    pub revalidate_secret: Option<String>,
    /// How long cached content lists stay fresh.
    pub content_ttl_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend_url: "http://localhost:54321/functions/v1".to_string(),
            database_url: None,
            bind: "0.0.0.0:4000".to_string(),
            revalidate_secret: None,
            content_ttl_secs: 3600,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = match config_file_path() {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file: {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("parsing config file: {}", path.display()))?
            }
            _ => Config::default(),
        };

        if let Ok(v) = std::env::var("APERTURE_BACKEND_URL") {
            cfg.backend_url = v;
        }
        if let Ok(v) = std::env::var("APERTURE_DATABASE_URL") {
            cfg.database_url = Some(v);
        }
        if let Ok(v) = std::env::var("APERTURE_BIND") {
            cfg.bind = v;
        }
        if let Ok(v) = std::env::var("APERTURE_REVALIDATE_SECRET") {
            cfg.revalidate_secret = Some(v);
        }
        if let Some(ttl) = std::env::var("APERTURE_CONTENT_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            cfg.content_ttl_secs = ttl;
        }

        Ok(cfg)
    }

    /// Validated backend base URL.
    pub fn backend_base(&self) -> Result<Url> {
        Url::parse(&self.backend_url)
            .with_context(|| format!("invalid backend URL: {}", self.backend_url))
    }
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("APERTURE_CONFIG") {
        return Some(PathBuf::from(explicit));
    }
    ProjectDirs::from("dev", "aperture", "aperture")
        .map(|proj| proj.config_dir().join("aperture.toml"))
}
