//! Grid index over the catalog.
//!
//! Built by one pass over subjects, one over levels and one over videos.
//! Lookups by cell or by video id are O(1) afterwards. There is no
//! incremental update: a catalog refresh builds a new index.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::{Catalog, CatalogItem, ComplexityLevel, Subject};
use crate::error::ValidationError;

/// What to do when two videos claim the same (subject, level) cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The video processed last owns the cell.
    #[default]
    LastWins,
    /// The video processed first owns the cell.
    FirstWins,
    /// Refuse to build the index.
    Reject,
}

/// Subject -> level -> item map plus a reverse map from video id to cell.
#[derive(Debug, Clone, Default)]
pub struct GridIndex {
    subjects: Vec<Subject>,
    levels: Vec<ComplexityLevel>,
    cells: HashMap<String, HashMap<u32, CatalogItem>>,
    by_video: HashMap<String, (String, u32)>,
}

impl GridIndex {
    pub fn from_catalog(catalog: &Catalog, policy: DuplicatePolicy) -> Result<Self, ValidationError> {
        Self::build(&catalog.subjects, &catalog.levels, &catalog.videos, policy)
    }

    /// Build the index from active subjects, levels and videos.
    ///
    /// Videos pointing at an inactive or unknown subject or level are
    /// left out of the grid.
    pub fn build(
        subjects: &[Subject],
        levels: &[ComplexityLevel],
        videos: &[CatalogItem],
        policy: DuplicatePolicy,
    ) -> Result<Self, ValidationError> {
        let mut subjects: Vec<Subject> = subjects.iter().filter(|s| s.is_active).cloned().collect();
        subjects.sort_by_key(|s| s.order);

        let mut levels: Vec<ComplexityLevel> = levels.iter().filter(|l| l.is_active).cloned().collect();
        levels.sort_by_key(|l| l.level);

        let mut cells: HashMap<String, HashMap<u32, CatalogItem>> = subjects
            .iter()
            .map(|s| (s.id.clone(), HashMap::new()))
            .collect();
        let mut by_video = HashMap::new();

        for video in videos.iter().filter(|v| v.is_active) {
            let Some(row) = cells.get_mut(&video.subject_id) else {
                debug!(video = %video.id, subject = %video.subject_id, "video skipped: subject not in grid");
                continue;
            };
            if !levels.iter().any(|l| l.level == video.complexity_level) {
                debug!(video = %video.id, level = video.complexity_level, "video skipped: level not in grid");
                continue;
            }

            if let Some(existing) = row.get(&video.complexity_level) {
                warn!(
                    subject = %video.subject_id,
                    level = video.complexity_level,
                    existing = %existing.id,
                    duplicate = %video.id,
                    ?policy,
                    "duplicate catalog cell"
                );
                match policy {
                    DuplicatePolicy::Reject => {
                        return Err(ValidationError::DuplicateCell {
                            subject: video.subject_id.clone(),
                            level: video.complexity_level,
                            existing: existing.id.clone(),
                            duplicate: video.id.clone(),
                        });
                    }
                    DuplicatePolicy::FirstWins => continue,
                    DuplicatePolicy::LastWins => {
                        by_video.remove(&existing.id);
                    }
                }
            }

            by_video.insert(
                video.id.clone(),
                (video.subject_id.clone(), video.complexity_level),
            );
            row.insert(video.complexity_level, video.clone());
        }

        Ok(Self {
            subjects,
            levels,
            cells,
            by_video,
        })
    }

    pub fn lookup(&self, subject_id: &str, level: u32) -> Option<&CatalogItem> {
        self.cells.get(subject_id)?.get(&level)
    }

    /// Find the item for a video id, if it owns a cell.
    pub fn item(&self, video_id: &str) -> Option<&CatalogItem> {
        let (subject, level) = self.by_video.get(video_id)?;
        self.lookup(subject, *level)
    }

    /// Active subjects in display order.
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Active levels in ascending order.
    pub fn levels(&self) -> &[ComplexityLevel] {
        &self.levels
    }

    pub fn has_subject(&self, subject_id: &str) -> bool {
        self.cells.contains_key(subject_id)
    }

    /// Number of defined complexity levels across the whole catalog.
    pub fn total_levels(&self) -> usize {
        self.levels.len()
    }

    /// Number of levels that have an item for this subject.
    pub fn max_level(&self, subject_id: &str) -> usize {
        self.cells.get(subject_id).map_or(0, HashMap::len)
    }

    /// Levels populated for a subject, ascending.
    pub fn levels_for(&self, subject_id: &str) -> Vec<u32> {
        let mut levels: Vec<u32> = self
            .cells
            .get(subject_id)
            .map(|row| row.keys().copied().collect())
            .unwrap_or_default();
        levels.sort_unstable();
        levels
    }

    /// Every grid item, by subject display order then level.
    pub fn items(&self) -> Vec<&CatalogItem> {
        self.subjects
            .iter()
            .flat_map(|s| {
                self.levels_for(&s.id)
                    .into_iter()
                    .filter_map(move |level| self.lookup(&s.id, level))
            })
            .collect()
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.by_video.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_video.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(id: &str, order: i32) -> Subject {
        Subject {
            id: id.into(),
            name: id.to_uppercase(),
            order,
            is_active: true,
        }
    }

    fn level(n: u32) -> ComplexityLevel {
        ComplexityLevel {
            level: n,
            name: format!("Level {n}"),
            is_active: true,
        }
    }

    fn video(id: &str, subject: &str, level: u32) -> CatalogItem {
        CatalogItem {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            subject_id: subject.into(),
            complexity_level: level,
            duration_seconds: 60,
            storage_path: String::new(),
            is_active: true,
        }
    }

    #[test]
    fn build_orders_subjects_and_levels() {
        let index = GridIndex::build(
            &[subject("math", 2), subject("art", 1)],
            &[level(2), level(1)],
            &[],
            DuplicatePolicy::LastWins,
        )
        .unwrap();

        let ids: Vec<&str> = index.subjects().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["art", "math"]);
        let levels: Vec<u32> = index.levels().iter().map(|l| l.level).collect();
        assert_eq!(levels, vec![1, 2]);
    }

    #[test]
    fn lookup_by_cell_and_by_video() {
        let index = GridIndex::build(
            &[subject("math", 1)],
            &[level(1), level(2)],
            &[video("v1", "math", 1), video("v2", "math", 2)],
            DuplicatePolicy::LastWins,
        )
        .unwrap();

        assert_eq!(index.lookup("math", 2).unwrap().id, "v2");
        assert_eq!(index.item("v1").unwrap().complexity_level, 1);
        assert!(index.lookup("math", 3).is_none());
        assert_eq!(index.max_level("math"), 2);
        assert_eq!(index.levels_for("math"), vec![1, 2]);
    }

    #[test]
    fn last_wins_keeps_one_entry_per_cell() {
        let index = GridIndex::build(
            &[subject("math", 1)],
            &[level(1)],
            &[video("first", "math", 1), video("second", "math", 1)],
            DuplicatePolicy::LastWins,
        )
        .unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup("math", 1).unwrap().id, "second");
        assert!(index.item("first").is_none());
    }

    #[test]
    fn first_wins_keeps_earliest() {
        let index = GridIndex::build(
            &[subject("math", 1)],
            &[level(1)],
            &[video("first", "math", 1), video("second", "math", 1)],
            DuplicatePolicy::FirstWins,
        )
        .unwrap();

        assert_eq!(index.lookup("math", 1).unwrap().id, "first");
        assert!(index.item("second").is_none());
    }

    #[test]
    fn reject_fails_on_duplicate() {
        let err = GridIndex::build(
            &[subject("math", 1)],
            &[level(1)],
            &[video("first", "math", 1), video("second", "math", 1)],
            DuplicatePolicy::Reject,
        )
        .unwrap_err();

        assert_eq!(
            err,
            ValidationError::DuplicateCell {
                subject: "math".into(),
                level: 1,
                existing: "first".into(),
                duplicate: "second".into(),
            }
        );
    }

    #[test]
    fn inactive_and_orphan_entries_are_skipped() {
        let mut inactive_subject = subject("history", 3);
        inactive_subject.is_active = false;
        let mut inactive_video = video("v-off", "math", 1);
        inactive_video.is_active = false;

        let index = GridIndex::build(
            &[subject("math", 1), inactive_subject],
            &[level(1)],
            &[
                inactive_video,
                video("v-history", "history", 1),
                video("v-level9", "math", 9),
            ],
            DuplicatePolicy::Reject,
        )
        .unwrap();

        assert!(index.is_empty());
        assert!(!index.has_subject("history"));
        assert_eq!(index.total_levels(), 1);
    }
}
