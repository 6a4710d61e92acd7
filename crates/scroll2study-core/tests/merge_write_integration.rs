//! Integration tests for merge-write semantics on the profile document.
//!
//! Two writers read the same profile, change disjoint fields and write
//! back patches; neither overwrites the other.

use chrono::Utc;
use serde_json::json;
use tempfile::TempDir;

use scroll2study_core::achievements::SocialCounter;
use scroll2study_core::profile::diff_patch;
use scroll2study_core::{
    CoreError, DatabaseError, ProfileStore, ProgressRecord, SqliteStore, UserId, UserProfile,
};

fn two_connections() -> (TempDir, SqliteStore, SqliteStore) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scroll2study.db");
    let a = SqliteStore::open_at(&path).unwrap();
    let b = SqliteStore::open_at(&path).unwrap();
    (dir, a, b)
}

#[test]
fn disjoint_writers_both_land() {
    let (_dir, a, b) = two_connections();
    let id = UserId::new("shared");
    a.create_profile(&UserProfile::new(id.clone(), false, Utc::now()))
        .unwrap();

    // both writers read the same version
    let base_a = a.load_profile(&id).unwrap().unwrap();
    let base_b = b.load_profile(&id).unwrap().unwrap();

    let mut changed_a = base_a.clone();
    changed_a.stats.completed_video_count = 3;
    let patch_a = diff_patch(&base_a.to_document().unwrap(), &changed_a.to_document().unwrap()).unwrap();

    let mut changed_b = base_b.clone();
    changed_b.preferences.daily_goal_minutes = 45;
    *changed_b.achievements.social.count_mut(SocialCounter::Notes) = 2;
    let patch_b = diff_patch(&base_b.to_document().unwrap(), &changed_b.to_document().unwrap()).unwrap();

    a.merge_profile(&id, &patch_a).unwrap();
    b.merge_profile(&id, &patch_b).unwrap();

    let merged = a.load_profile(&id).unwrap().unwrap();
    assert_eq!(merged.stats.completed_video_count, 3);
    assert_eq!(merged.preferences.daily_goal_minutes, 45);
    assert_eq!(merged.achievements.social.count(SocialCounter::Notes), 2);
}

#[test]
fn patch_that_breaks_the_schema_is_rejected() {
    let (_dir, a, _b) = two_connections();
    let id = UserId::new("strict");
    a.create_profile(&UserProfile::new(id.clone(), true, Utc::now()))
        .unwrap();

    let err = a
        .merge_profile(&id, &json!({"stats": {"completedVideoCount": null}}))
        .unwrap_err();
    assert!(matches!(err, CoreError::Parse(_)));

    let stored = a.load_profile(&id).unwrap().unwrap();
    assert_eq!(stored.stats.completed_video_count, 0);
}

#[test]
fn merge_into_missing_profile_is_not_found() {
    let (_dir, a, _b) = two_connections();
    let err = a
        .merge_profile(&UserId::new("nobody"), &json!({"settings": {"darkMode": true}}))
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { kind: "profile", .. }));
}

#[test]
fn a_watch_is_counted_by_only_one_connection() {
    let (_dir, a, b) = two_connections();
    let id = UserId::new("twice");
    a.create_profile(&UserProfile::new(id.clone(), false, Utc::now()))
        .unwrap();
    a.record_progress(&ProgressRecord::new(id.clone(), "v1", Utc::now()))
        .unwrap();

    // both connections saw the record as pending
    let counted = json!({"stats": {"completedVideoCount": 1, "totalWatchTimeSeconds": 60}});
    a.merge_profile_counting(&id, &counted, &["v1".to_string()]).unwrap();
    let err = b
        .merge_profile_counting(&id, &counted, &["v1".to_string()])
        .unwrap_err();
    assert!(matches!(err, CoreError::Database(DatabaseError::Conflict(_))));

    let records = b.progress_records(&id).unwrap();
    assert!(records[0].counted);
    assert_eq!(b.load_profile(&id).unwrap().unwrap().stats.completed_video_count, 1);
}

#[test]
fn stale_writer_keeps_unlocks_from_other_connection() {
    let (_dir, a, b) = two_connections();
    let id = UserId::new("devices");
    a.create_profile(&UserProfile::new(id.clone(), false, Utc::now()))
        .unwrap();

    let stale = b.load_profile(&id).unwrap().unwrap();

    let mut fresh = a.load_profile(&id).unwrap().unwrap();
    fresh.achievements.streaks.unlocked_milestones.unlock(3);
    fresh.achievements.streaks.unlocked_milestones.unlock(7);
    let patch = diff_patch(&stale.to_document().unwrap(), &fresh.to_document().unwrap()).unwrap();
    a.merge_profile(&id, &patch).unwrap();

    let mut changed = stale.clone();
    changed.achievements.streaks.unlocked_milestones.unlock(3);
    changed.stats.study_streak = 3;
    let patch = diff_patch(&stale.to_document().unwrap(), &changed.to_document().unwrap()).unwrap();
    b.merge_profile(&id, &patch).unwrap();

    let merged = a.load_profile(&id).unwrap().unwrap();
    assert!(merged.achievements.streaks.unlocked_milestones.contains(7));
    assert_eq!(merged.stats.study_streak, 3);
}
