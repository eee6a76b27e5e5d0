use super::{PlaylistItem, PlaylistPage, PlaylistSource};
use crate::config::Config;
use crate::error::CollectError;
use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use log::{debug, info};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Token cache contents. Compatible with the `.cache` file other Spotify
/// tooling writes: unknown fields such as `expires_in` are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_at: i64, // epoch seconds
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Reduce a playlist reference to its bare id. Accepts a bare id, a
/// `spotify:playlist:<id>` URI, or an `https://open.spotify.com/playlist/<id>`
/// link (query string such as `?si=` ignored).
pub fn playlist_id_from(input: &str) -> Result<String> {
    let input = input.trim();
    let invalid = || CollectError::Config(format!("not a playlist id, URI or link: {}", input));

    if let Some(rest) = input.strip_prefix("spotify:") {
        // spotify:playlist:<id>, or the older spotify:user:<user>:playlist:<id>
        let parts: Vec<&str> = rest.split(':').collect();
        return match parts.as_slice() {
            ["playlist", id] | ["user", _, "playlist", id] if !id.is_empty() => Ok(id.to_string()),
            _ => Err(invalid().into()),
        };
    }

    if input.starts_with("http://") || input.starts_with("https://") {
        let url = url::Url::parse(input).map_err(|_| invalid())?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();
        return match segments.iter().position(|s| *s == "playlist") {
            Some(i) if i + 1 < segments.len() => Ok(segments[i + 1].to_string()),
            _ => Err(invalid().into()),
        };
    }

    if input.is_empty() || input.contains(|c: char| c == '/' || c == ':' || c.is_whitespace()) {
        return Err(invalid().into());
    }
    Ok(input.to_string())
}

fn default_token_type() -> String { "Bearer".into() }
fn default_expires_in() -> i64 { 3600 }

impl StoredToken {
    /// Read the token cache. A missing file is `Ok(None)`; an unparsable one is an error.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let s = std::fs::read_to_string(path).map_err(|e| CollectError::storage(path, e))?;
        let st: StoredToken =
            serde_json::from_str(&s).map_err(|e| CollectError::malformed(path, e))?;
        Ok(Some(st))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CollectError::storage(parent, e))?;
        }
        let s = serde_json::to_string_pretty(self)?;
        std::fs::write(path, s).map_err(|e| CollectError::storage(path, e))?;
        Ok(())
    }

    fn is_expiring(&self, now: i64) -> bool {
        now + 30 >= self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    refresh_token: Option<String>,
    scope: Option<String>,
}

/// Read-only Spotify Web API client.
///
/// Built once at process start and handed to the fetcher. The access token is
/// loaded lazily from the token cache, refreshed when it is about to expire,
/// and the refreshed token is written back to the cache immediately.
/// Endpoints default to SPOTIFY_API_BASE / SPOTIFY_AUTH_BASE when set.
pub struct SpotifyClient {
    client: Client,
    client_id: String,
    client_secret: String,
    token_cache: PathBuf,
    api_base: String,
    auth_base: String,
    token: tokio::sync::Mutex<Option<StoredToken>>,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String, token_cache: PathBuf) -> Self {
        Self {
            client: Client::new(),
            client_id,
            client_secret,
            token_cache,
            api_base: Self::default_api_base(),
            auth_base: Self::default_auth_base(),
            token: tokio::sync::Mutex::new(None),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.client_id.clone(),
            cfg.client_secret().to_string(),
            cfg.token_cache.clone(),
        )
    }

    /// Point the client at other endpoints (mock servers in tests).
    pub fn with_base_urls(mut self, api_base: &str, auth_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.auth_base = auth_base.trim_end_matches('/').to_string();
        self
    }

    pub fn default_auth_base() -> String {
        env::var("SPOTIFY_AUTH_BASE").unwrap_or_else(|_| "https://accounts.spotify.com".into())
    }

    pub fn default_api_base() -> String {
        // include v1 path by default
        env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| "https://api.spotify.com/v1".into())
    }

    pub fn auth_base(&self) -> &str {
        &self.auth_base
    }

    fn basic_auth_header(&self) -> String {
        format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret))
        )
    }

    async fn ensure_token(&self) -> Result<()> {
        let mut lock = self.token.lock().await;
        if lock.is_none() {
            let st = StoredToken::load(&self.token_cache)?.ok_or_else(|| {
                CollectError::Auth(format!(
                    "no cached token at {}; run the auth command first",
                    self.token_cache.display()
                ))
            })?;
            *lock = Some(st);
        }
        if let Some(st) = &*lock {
            if st.is_expiring(Utc::now().timestamp()) {
                debug!("Spotify token is near expiry, refreshing");
                let mut cur = st.clone();
                self.refresh_token_internal(&mut cur).await?;
                *lock = Some(cur);
            }
        }
        Ok(())
    }

    async fn refresh_token_internal(&self, cur: &mut StoredToken) -> Result<()> {
        let refresh_token = cur
            .refresh_token
            .clone()
            .ok_or_else(|| CollectError::Auth("token expired and no refresh token cached".into()))?;
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];
        let url = format!("{}/api/token", self.auth_base);
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.basic_auth_header())
            .form(&params)
            .send()
            .await
            .map_err(CollectError::from)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(
                CollectError::Auth(format!("failed to refresh token: {} - {}", status, body)).into(),
            );
        }
        let tr: TokenResponse = resp.json().await.map_err(CollectError::from)?;
        cur.access_token = tr.access_token;
        cur.token_type = tr.token_type;
        cur.expires_at = Utc::now().timestamp() + tr.expires_in;
        // Spotify usually omits refresh_token on refresh; keep the old one then.
        if let Some(rt) = tr.refresh_token {
            cur.refresh_token = Some(rt);
        }
        if let Some(s) = tr.scope {
            cur.scope = Some(s);
        }
        cur.save(&self.token_cache)?;
        Ok(())
    }

    /// Exchange an authorization code for a token and write it to the token cache.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<StoredToken> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        let url = format!("{}/api/token", self.auth_base);
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.basic_auth_header())
            .form(&params)
            .send()
            .await
            .map_err(CollectError::from)?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(CollectError::Auth(format!("token exchange failed: {} => {}", status, txt)).into());
        }
        let tr: TokenResponse = resp.json().await.map_err(CollectError::from)?;
        let st = StoredToken {
            access_token: tr.access_token,
            token_type: tr.token_type,
            expires_at: Utc::now().timestamp() + tr.expires_in,
            refresh_token: tr.refresh_token,
            scope: tr.scope,
        };
        st.save(&self.token_cache)?;
        *self.token.lock().await = Some(st.clone());
        info!("Spotify token saved to {}", self.token_cache.display());
        Ok(st)
    }

    pub async fn get_bearer(&self) -> Result<String> {
        self.ensure_token().await?;
        let lock = self.token.lock().await;
        let st = lock
            .as_ref()
            .ok_or_else(|| CollectError::Auth("no token loaded".into()))?;
        Ok(format!("Bearer {}", st.access_token))
    }
}

#[async_trait]
impl PlaylistSource for SpotifyClient {
    fn name(&self) -> &str {
        "spotify"
    }

    /// Single page only (the API's default page size); `next` is not followed.
    async fn get_playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>> {
        let playlist_id = playlist_id_from(playlist_id)?;
        let bearer = self.get_bearer().await?;
        let url = format!(
            "{}/playlists/{}/tracks",
            self.api_base,
            urlencoding::encode(&playlist_id)
        );
        debug!("GET {}", url);
        let resp = self
            .client
            .get(&url)
            .header(AUTHORIZATION, &bearer)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(CollectError::from)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CollectError::Source { status: status.as_u16(), body }.into());
        }
        let page: PlaylistPage = resp.json().await.map_err(CollectError::from)?;
        Ok(page.items)
    }
}
