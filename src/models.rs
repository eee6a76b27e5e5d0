use serde::{Deserialize, Serialize};

/// One playlist entry, flattened from the source's nested track object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub name: String,
    /// Contributing artist names joined with ", ".
    pub artist: String,
    pub album: String,
    pub release_date: String,
    pub url: String,
    pub added_at: String,
}

impl TrackRecord {
    pub fn key(&self) -> TrackKey {
        TrackKey {
            name: self.name.clone(),
            artist: self.artist.clone(),
            url: self.url.clone(),
        }
    }
}

/// Identity of a track for snapshot comparison. Album, release date and
/// added_at are not part of it.
///
/// Field order drives the derived `Ord`, which is the order delta entries
/// are written in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackKey {
    pub name: String,
    pub artist: String,
    pub url: String,
}

/// Tracks that appeared or disappeared relative to the month's snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub added: Vec<TrackKey>,
    pub removed: Vec<TrackKey>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
