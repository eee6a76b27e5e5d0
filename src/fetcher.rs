use crate::api::{PlaylistItem, PlaylistSource};
use crate::models::TrackRecord;
use anyhow::{Context, Result};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Fetch the playlist's current entries and flatten them into track records.
///
/// Source errors are returned unchanged apart from added context; there is
/// no retry. Entries without a track object are skipped with a warning.
pub async fn fetch_playlist_tracks(
    source: &dyn PlaylistSource,
    playlist_id: &str,
) -> Result<Vec<TrackRecord>> {
    let items = source
        .get_playlist_items(playlist_id)
        .await
        .with_context(|| format!("fetching playlist {} from {}", playlist_id, source.name()))?;

    let mut tracks = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match normalize_item(item) {
            Some(t) => tracks.push(t),
            None => warn!("Skipping playlist entry {}: track is unavailable", idx),
        }
    }

    let mut seen = HashSet::new();
    let duplicates = tracks.iter().filter(|t| !seen.insert(t.key())).count();
    if duplicates > 0 {
        debug!("{} duplicate track(s) will collapse under set comparison", duplicates);
    }

    info!("Fetched {} track(s) from playlist {}", tracks.len(), playlist_id);
    Ok(tracks)
}

/// Flatten one raw entry. Returns None when the entry has no track.
pub fn normalize_item(item: &PlaylistItem) -> Option<TrackRecord> {
    let track = item.track.as_ref()?;
    let artist = track
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    Some(TrackRecord {
        name: track.name.clone(),
        artist,
        album: track.album.name.clone(),
        release_date: track.album.release_date.clone().unwrap_or_default(),
        url: track.external_urls.spotify.clone().unwrap_or_default(),
        added_at: item.added_at.clone().unwrap_or_default(),
    })
}
