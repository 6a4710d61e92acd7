//! Per-user watch progress over the catalog grid.
//!
//! The store keeps bare `(user, video)` completion records. Subject and
//! level are joined from the current [`GridIndex`] whenever a progress map
//! is built, so a catalog change is reflected without rewriting records.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::GridIndex;
use crate::profile::UserId;

/// Number of completed videos per displayed level band.
const VIDEOS_PER_LEVEL: usize = 5;

/// A stored completion marker.
///
/// `counted` flips once the watch has been added to the profile's video
/// counters, in the same store write as the counters themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub user_id: UserId,
    pub video_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub counted: bool,
}

impl ProgressRecord {
    /// A fresh, not yet counted completion.
    pub fn new(user_id: UserId, video_id: impl Into<String>, completed_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            video_id: video_id.into(),
            completed_at,
            counted: false,
        }
    }
}

/// Watched cells, keyed by subject then level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMap {
    cells: BTreeMap<String, BTreeSet<u32>>,
}

impl ProgressMap {
    /// Join completion records against the grid. Records whose video no
    /// longer owns a cell are skipped.
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a ProgressRecord>,
        index: &GridIndex,
    ) -> Self {
        let mut map = Self::default();
        for record in records {
            match index.item(&record.video_id) {
                Some(item) => {
                    map.insert(&item.subject_id, item.complexity_level);
                }
                None => {
                    warn!(
                        user = %record.user_id,
                        video = %record.video_id,
                        "progress record refers to a video outside the catalog grid"
                    );
                }
            }
        }
        map
    }

    /// Mark a cell watched. Returns `false` if it already was.
    pub fn insert(&mut self, subject_id: &str, level: u32) -> bool {
        self.cells
            .entry(subject_id.to_string())
            .or_default()
            .insert(level)
    }

    pub fn is_watched(&self, subject_id: &str, level: u32) -> bool {
        self.cells
            .get(subject_id)
            .is_some_and(|levels| levels.contains(&level))
    }

    pub fn completed_levels(&self, subject_id: &str) -> usize {
        self.cells.get(subject_id).map_or(0, BTreeSet::len)
    }

    pub fn total_completed(&self) -> usize {
        self.cells.values().map(BTreeSet::len).sum()
    }

    /// Completed levels for a subject over the global level count.
    ///
    /// A subject with fewer levels than the catalog-wide maximum cannot
    /// reach 1.0.
    pub fn subject_progress(&self, subject_id: &str, index: &GridIndex) -> f64 {
        let total = index.total_levels();
        if total == 0 {
            return 0.0;
        }
        (self.completed_levels(subject_id) as f64 / total as f64).min(1.0)
    }

    /// Coarse displayed level: one band per five completed videos,
    /// clamped to `[1, total levels]`.
    pub fn current_level(&self, index: &GridIndex) -> u32 {
        let max = index.total_levels().max(1);
        let level = self.total_completed() / VIDEOS_PER_LEVEL + 1;
        level.clamp(1, max) as u32
    }

    /// Subjects whose every populated level has been watched.
    pub fn completed_subjects(&self, index: &GridIndex) -> u32 {
        index
            .subjects()
            .iter()
            .filter(|subject| {
                let levels = index.levels_for(&subject.id);
                !levels.is_empty() && levels.iter().all(|&l| self.is_watched(&subject.id, l))
            })
            .count() as u32
    }
}
