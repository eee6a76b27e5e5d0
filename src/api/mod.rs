pub mod spotify;
pub mod mock;
pub mod spotify_auth;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Source trait: the single read the fetcher needs.
/// Implementations: spotify::SpotifyClient and mock::MockSource.
#[async_trait::async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Return the first page of entries for a playlist, in playlist order.
    async fn get_playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>>;

    /// Return the source's name (for logging)
    fn name(&self) -> &str;
}

/// Raw playlist entry as returned by `GET /playlists/{id}/tracks`.
/// `track` is null for entries whose track is no longer available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub added_at: Option<String>,
    #[serde(default)]
    pub track: Option<RawTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTrack {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<RawArtist>,
    // episodes carry a show instead of an album
    #[serde(default)]
    pub album: RawAlbum,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArtist {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAlbum {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

/// One page of a playlist's entries. Only `items` is used.
#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}
