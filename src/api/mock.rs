use super::{ExternalUrls, PlaylistItem, PlaylistSource, RawAlbum, RawArtist, RawTrack};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::info;

/// In-memory source used in tests and for dry runs.
/// Returns a fixed item list, or a fixed error message when built with `failing`.
pub struct MockSource {
    items: Vec<PlaylistItem>,
    error: Option<String>,
}

impl MockSource {
    pub fn new(items: Vec<PlaylistItem>) -> Self {
        Self { items, error: None }
    }

    pub fn failing(message: &str) -> Self {
        Self { items: Vec::new(), error: Some(message.to_string()) }
    }

    /// Build a raw entry with the fields the fetcher reads.
    pub fn item(name: &str, artists: &[&str], url: &str) -> PlaylistItem {
        PlaylistItem {
            added_at: Some("2024-01-01T00:00:00Z".into()),
            track: Some(RawTrack {
                name: name.to_string(),
                artists: artists.iter().map(|a| RawArtist { name: a.to_string() }).collect(),
                album: RawAlbum {
                    name: format!("{} (album)", name),
                    release_date: Some("2020".into()),
                },
                external_urls: ExternalUrls { spotify: Some(url.to_string()) },
            }),
        }
    }
}

#[async_trait]
impl PlaylistSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>> {
        if let Some(msg) = &self.error {
            return Err(anyhow!("{}", msg));
        }
        info!("MockSource: get_playlist_items {} -> {} items", playlist_id, self.items.len());
        Ok(self.items.clone())
    }
}
