use crate::error::CollectError;
use crate::models::{Delta, TrackKey, TrackRecord};
use crate::store::{DatedLayout, JsonStore};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::info;

/// What a run should persist, decided before any write happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateSnapshot,
    WriteDelta(Delta),
    NoOp,
}

/// Result of a completed run, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    SnapshotCreated { path: PathBuf, tracks: usize },
    DeltaWritten { path: PathBuf, added: usize, removed: usize },
    NoChanges,
}

/// Set difference on identity triples, both directions. Entries come out
/// sorted by (name, artist, url).
pub fn compute_delta(stored: &[TrackRecord], current: &[TrackRecord]) -> Delta {
    let stored: BTreeSet<TrackKey> = stored.iter().map(TrackRecord::key).collect();
    let current: BTreeSet<TrackKey> = current.iter().map(TrackRecord::key).collect();
    Delta {
        added: current.difference(&stored).cloned().collect(),
        removed: stored.difference(&current).cloned().collect(),
    }
}

/// Pure decision step. `existing` is this month's snapshot, if one was found.
pub fn decide(existing: Option<&[TrackRecord]>, current: &[TrackRecord]) -> Action {
    match existing {
        None => Action::CreateSnapshot,
        Some(stored) => {
            let delta = compute_delta(stored, current);
            if delta.is_empty() {
                Action::NoOp
            } else {
                Action::WriteDelta(delta)
            }
        }
    }
}

/// Applies `decide` against a store: reads at most one snapshot, writes at
/// most one file.
pub struct Reconciler<'a> {
    store: &'a dyn JsonStore,
    layout: DatedLayout,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn JsonStore, layout: DatedLayout) -> Self {
        Self { store, layout }
    }

    /// Load the snapshot for `date`'s month. Missing is `Ok(None)`; unreadable
    /// or malformed is an error.
    pub fn load_snapshot(&self, date: NaiveDate) -> Result<Option<Vec<TrackRecord>>> {
        let path = self.layout.snapshot_path(date);
        if !self.store.exists(&path) {
            return Ok(None);
        }
        let value = self.store.read_json(&path)?;
        let tracks: Vec<TrackRecord> =
            serde_json::from_value(value).map_err(|e| CollectError::malformed(&path, e))?;
        Ok(Some(tracks))
    }

    pub fn run(&self, date: NaiveDate, current: &[TrackRecord]) -> Result<Outcome> {
        let existing = self
            .load_snapshot(date)
            .with_context(|| format!("loading snapshot for {}", date.format("%Y-%m")))?;

        match decide(existing.as_deref(), current) {
            Action::CreateSnapshot => {
                let path = self.layout.snapshot_path(date);
                self.store.ensure_dir(&self.layout.month_dir(date))?;
                self.store.write_json(&path, &serde_json::to_value(current)?)?;
                info!("Snapshot saved to {} ({} tracks)", path.display(), current.len());
                Ok(Outcome::SnapshotCreated { path, tracks: current.len() })
            }
            Action::WriteDelta(delta) => {
                let path = self.layout.delta_path(date);
                self.store.ensure_dir(&self.layout.month_dir(date))?;
                self.store.write_json(&path, &serde_json::to_value(&delta)?)?;
                info!(
                    "Changes saved to {} (+{} / -{})",
                    path.display(),
                    delta.added.len(),
                    delta.removed.len()
                );
                Ok(Outcome::DeltaWritten {
                    path,
                    added: delta.added.len(),
                    removed: delta.removed.len(),
                })
            }
            Action::NoOp => {
                info!("No changes detected since the {} snapshot", date.format("%Y-%m"));
                Ok(Outcome::NoChanges)
            }
        }
    }
}
