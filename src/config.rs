use crate::error::CollectError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable that supplies the client secret. Takes precedence
/// over `client_secret` in the config file.
pub const CLIENT_SECRET_ENV: &str = "SPOTIPY_CLIENT_SECRET";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub client_id: String,
    pub redirect_uri: String,
    pub playlist_id: String,

    #[serde(default)]
    pub client_secret: Option<String>,

    // Output root; snapshots and deltas live under <data_dir>/YYYY-MM/
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Cached OAuth token JSON written by `auth` and refreshed in place.
    #[serde(default = "default_token_cache")]
    pub token_cache: PathBuf,

    /// When set, logs are also written to a daily-rotated file here.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default = "default_scope")]
    pub scope: String,
}

fn default_data_dir() -> PathBuf { "data".into() }
fn default_token_cache() -> PathBuf { ".cache".into() }
fn default_scope() -> String { "playlist-read-private".into() }

impl Config {
    /// Parse a config file. `.json` files are read as JSON, anything else as TOML.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| CollectError::storage(path, e))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let cfg: Config = if is_json {
            serde_json::from_str(&s)
                .map_err(|e| CollectError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            toml::from_str(&s)
                .map_err(|e| CollectError::Config(format!("{}: {}", path.display(), e)))?
        };
        Ok(cfg)
    }

    /// Resolve the client secret from `SPOTIPY_CLIENT_SECRET`. Call once
    /// logging is up so the missing-secret warning is recorded.
    pub fn apply_env_secret(&mut self) {
        self.apply_secret(std::env::var(CLIENT_SECRET_ENV).ok());
    }

    /// Overlay a secret taken from the environment. A missing secret is only
    /// reported; token refresh will fail later if it is actually needed.
    pub fn apply_secret(&mut self, env_secret: Option<String>) {
        if let Some(s) = env_secret.filter(|s| !s.trim().is_empty()) {
            self.client_secret = Some(s);
        }
        match self.client_secret.as_deref() {
            Some(s) if !s.trim().is_empty() => info!("{} loaded successfully", CLIENT_SECRET_ENV),
            _ => {
                self.client_secret = None;
                warn!("{} is not set", CLIENT_SECRET_ENV);
            }
        }
    }

    pub fn client_secret(&self) -> &str {
        self.client_secret.as_deref().unwrap_or("")
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (field, value) in [
            ("client_id", &self.client_id),
            ("redirect_uri", &self.redirect_uri),
            ("playlist_id", &self.playlist_id),
        ] {
            if value.trim().is_empty() {
                return Err(CollectError::Config(format!("{} must not be empty", field)).into());
            }
        }
        Ok(())
    }
}
