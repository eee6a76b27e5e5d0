use crate::api::PlaylistSource;
use crate::fetcher::fetch_playlist_tracks;
use crate::reconcile::{Outcome, Reconciler};
use crate::store::{DatedLayout, JsonStore};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

/// One collection run: fetch the playlist, then snapshot or diff it for `date`.
///
/// Nothing is written if the fetch fails.
pub async fn run_collect(
    source: &dyn PlaylistSource,
    store: &dyn JsonStore,
    layout: DatedLayout,
    playlist_id: &str,
    date: NaiveDate,
) -> Result<Outcome> {
    info!("Collecting playlist {} for {}", playlist_id, date);
    let tracks = fetch_playlist_tracks(source, playlist_id).await?;
    Reconciler::new(store, layout)
        .run(date, &tracks)
        .with_context(|| format!("reconciling playlist {} for {}", playlist_id, date))
}
