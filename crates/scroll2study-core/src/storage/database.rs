//! SQLite-backed document store.
//!
//! Provides persistent storage for:
//! - Profile documents (JSON, merge-written)
//! - Completion records
//! - The video catalog
//! - Collections

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde_json::Value;
use tracing::debug;

use super::{data_dir, migrations, ProfileStore};
use crate::catalog::{Catalog, CatalogItem, ComplexityLevel, Subject};
use crate::collection::Collection;
use crate::error::{CoreError, DatabaseError, Result};
use crate::profile::{merge_profile_patch, UserId, UserProfile};
use crate::progress::ProgressRecord;

/// SQLite database for profiles, progress and catalog.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/scroll2study.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("scroll2study.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CoreError::Parse(format!("bad timestamp '{raw}': {e}")))
}

impl ProfileStore for SqliteStore {
    fn load_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM profiles WHERE user_id = ?1",
                params![user_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => {
                let doc: Value = serde_json::from_str(&raw)?;
                Ok(Some(UserProfile::from_document(&doc)?))
            }
            None => Ok(None),
        }
    }

    fn create_profile(&self, profile: &UserProfile) -> Result<bool> {
        let document = serde_json::to_string(&profile.to_document()?)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO profiles (user_id, document, updated_at) VALUES (?1, ?2, ?3)",
            params![profile.id.as_str(), document, profile.updated_at.to_rfc3339()],
        )?;
        Ok(inserted == 1)
    }

    fn merge_profile_counting(&self, user_id: &UserId, patch: &Value, video_ids: &[String]) -> Result<()> {
        // Take the write lock before reading so the merge sees the latest document.
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let raw: Option<String> = tx
            .query_row(
                "SELECT document FROM profiles WHERE user_id = ?1",
                params![user_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(raw) = raw else {
            return Err(CoreError::not_found("profile", user_id.as_str()));
        };

        let mut doc: Value = serde_json::from_str(&raw)?;
        merge_profile_patch(&mut doc, patch);
        let merged = UserProfile::from_document(&doc)?;

        for video_id in video_ids {
            let flagged = tx.execute(
                "UPDATE progress SET counted = 1 WHERE user_id = ?1 AND video_id = ?2 AND counted = 0",
                params![user_id.as_str(), video_id],
            )?;
            if flagged != 1 {
                // dropping the transaction rolls back the flags set so far
                return Err(DatabaseError::Conflict(format!("watch of '{video_id}' already counted")).into());
            }
        }

        tx.execute(
            "UPDATE profiles SET document = ?2, updated_at = ?3 WHERE user_id = ?1",
            params![
                user_id.as_str(),
                serde_json::to_string(&doc)?,
                merged.updated_at.to_rfc3339()
            ],
        )?;
        tx.commit()?;
        debug!(user = %user_id, counted = video_ids.len(), "profile merged");
        Ok(())
    }

    fn record_progress(&self, record: &ProgressRecord) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO progress (user_id, video_id, completed_at) VALUES (?1, ?2, ?3)",
            params![
                record.user_id.as_str(),
                record.video_id,
                record.completed_at.to_rfc3339()
            ],
        )?;
        Ok(inserted == 1)
    }

    fn progress_records(&self, user_id: &UserId) -> Result<Vec<ProgressRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT video_id, completed_at, counted FROM progress WHERE user_id = ?1 ORDER BY completed_at",
        )?;
        let rows = stmt.query_map(params![user_id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (video_id, completed_at, counted) = row?;
            records.push(ProgressRecord {
                user_id: user_id.clone(),
                video_id,
                completed_at: parse_time(&completed_at)?,
                counted,
            });
        }
        Ok(records)
    }

    fn load_catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::default();

        let mut stmt = self
            .conn
            .prepare("SELECT id, name, sort_order, is_active FROM subjects ORDER BY sort_order")?;
        let rows = stmt.query_map([], |row| {
            Ok(Subject {
                id: row.get(0)?,
                name: row.get(1)?,
                order: row.get(2)?,
                is_active: row.get(3)?,
            })
        })?;
        for row in rows {
            catalog.subjects.push(row?);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT level, name, is_active FROM levels ORDER BY level")?;
        let rows = stmt.query_map([], |row| {
            Ok(ComplexityLevel {
                level: row.get(0)?,
                name: row.get(1)?,
                is_active: row.get(2)?,
            })
        })?;
        for row in rows {
            catalog.levels.push(row?);
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, subject_id, complexity_level, duration_seconds,
                    storage_path, is_active
             FROM videos ORDER BY seq",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CatalogItem {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                subject_id: row.get(3)?,
                complexity_level: row.get(4)?,
                duration_seconds: row.get(5)?,
                storage_path: row.get(6)?,
                is_active: row.get(7)?,
            })
        })?;
        for row in rows {
            catalog.videos.push(row?);
        }

        Ok(catalog)
    }

    fn replace_catalog(&self, catalog: &Catalog) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch("DELETE FROM subjects; DELETE FROM levels; DELETE FROM videos;")?;

        for subject in &catalog.subjects {
            tx.execute(
                "INSERT OR REPLACE INTO subjects (id, name, sort_order, is_active) VALUES (?1, ?2, ?3, ?4)",
                params![subject.id, subject.name, subject.order, subject.is_active],
            )?;
        }
        for level in &catalog.levels {
            tx.execute(
                "INSERT OR REPLACE INTO levels (level, name, is_active) VALUES (?1, ?2, ?3)",
                params![level.level, level.name, level.is_active],
            )?;
        }
        for video in &catalog.videos {
            tx.execute(
                "INSERT OR REPLACE INTO videos
                    (id, title, description, subject_id, complexity_level, duration_seconds,
                     storage_path, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    video.id,
                    video.title,
                    video.description,
                    video.subject_id,
                    video.complexity_level,
                    video.duration_seconds,
                    video.storage_path,
                    video.is_active
                ],
            )?;
        }

        tx.commit()?;
        debug!(
            subjects = catalog.subjects.len(),
            levels = catalog.levels.len(),
            videos = catalog.videos.len(),
            "catalog replaced"
        );
        Ok(())
    }

    fn save_collection(&self, user_id: &UserId, collection: &Collection) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO collections (id, user_id, document, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                collection.id,
                user_id.as_str(),
                serde_json::to_string(collection)?,
                collection.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn collections(&self, user_id: &UserId) -> Result<Vec<Collection>> {
        let mut stmt = self.conn.prepare(
            "SELECT document FROM collections WHERE user_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![user_id.as_str()], |row| row.get::<_, String>(0))?;
        let mut collections = Vec::new();
        for row in rows {
            collections.push(serde_json::from_str(&row?)?);
        }
        Ok(collections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with_profile() -> (SqliteStore, UserId) {
        let store = SqliteStore::open_memory().unwrap();
        let id = UserId::new("u1");
        store
            .create_profile(&UserProfile::new(id.clone(), false, Utc::now()))
            .unwrap();
        (store, id)
    }

    #[test]
    fn create_profile_is_insert_once() {
        let (store, id) = store_with_profile();
        let again = UserProfile::new(id.clone(), true, Utc::now());
        assert!(!store.create_profile(&again).unwrap());
        assert!(!store.load_profile(&id).unwrap().unwrap().is_anonymous);
    }

    #[test]
    fn merge_updates_only_patched_fields() {
        let (store, id) = store_with_profile();
        store
            .merge_profile(&id, &json!({"stats": {"studyStreak": 4}}))
            .unwrap();
        store
            .merge_profile(&id, &json!({"settings": {"darkMode": true}}))
            .unwrap();

        let profile = store.load_profile(&id).unwrap().unwrap();
        assert_eq!(profile.stats.study_streak, 4);
        assert!(profile.settings.dark_mode);
    }

    #[test]
    fn merge_that_breaks_schema_is_rejected() {
        let (store, id) = store_with_profile();
        let err = store
            .merge_profile(&id, &json!({"stats": {"studyStreak": null}}))
            .unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)));
        assert_eq!(store.load_profile(&id).unwrap().unwrap().stats.study_streak, 0);
    }

    #[test]
    fn merge_missing_profile_is_not_found() {
        let store = SqliteStore::open_memory().unwrap();
        let err = store
            .merge_profile(&UserId::new("ghost"), &json!({}))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "profile", .. }));
    }

    #[test]
    fn corrupt_document_fails_closed() {
        let (store, id) = store_with_profile();
        store
            .conn()
            .execute(
                "UPDATE profiles SET document = '{\"id\":\"u1\"}' WHERE user_id = ?1",
                params![id.as_str()],
            )
            .unwrap();
        assert!(matches!(store.load_profile(&id), Err(CoreError::Parse(_))));
    }

    #[test]
    fn progress_records_are_unique_per_video() {
        let (store, id) = store_with_profile();
        let record = ProgressRecord::new(id.clone(), "v1", Utc::now());
        assert!(store.record_progress(&record).unwrap());
        assert!(!store.record_progress(&record).unwrap());
        assert_eq!(store.progress_records(&id).unwrap().len(), 1);
    }

    #[test]
    fn catalog_round_trip_keeps_video_order() {
        let store = SqliteStore::open_memory().unwrap();
        let catalog: Catalog = serde_json::from_value(json!({
            "subjects": [{"id": "math", "name": "Math", "order": 1}],
            "levels": [{"level": 1, "name": "Intro"}],
            "videos": [
                {"id": "b", "title": "B", "subjectId": "math", "complexityLevel": 1, "durationSeconds": 60},
                {"id": "a", "title": "A", "subjectId": "math", "complexityLevel": 1, "durationSeconds": 60}
            ]
        }))
        .unwrap();
        store.replace_catalog(&catalog).unwrap();
        let loaded = store.load_catalog().unwrap();
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn counting_merge_is_all_or_nothing() {
        let (store, id) = store_with_profile();
        store.record_progress(&ProgressRecord::new(id.clone(), "v1", Utc::now())).unwrap();

        // "v2" has no record, so neither the patch nor the v1 flag lands
        let err = store
            .merge_profile_counting(
                &id,
                &json!({"stats": {"completedVideoCount": 2}}),
                &["v1".into(), "v2".into()],
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Database(DatabaseError::Conflict(_))));
        assert!(!store.progress_records(&id).unwrap()[0].counted);
        assert_eq!(store.load_profile(&id).unwrap().unwrap().stats.completed_video_count, 0);

        store
            .merge_profile_counting(&id, &json!({"stats": {"completedVideoCount": 1}}), &["v1".into()])
            .unwrap();
        assert!(store.progress_records(&id).unwrap()[0].counted);
        assert_eq!(store.load_profile(&id).unwrap().unwrap().stats.completed_video_count, 1);
    }

    #[test]
    fn merge_keeps_stored_unlocks() {
        let (store, id) = store_with_profile();
        store
            .merge_profile(&id, &json!({"achievements": {"streaks": {"unlockedMilestones": [3, 7]}}}))
            .unwrap();
        store
            .merge_profile(&id, &json!({"achievements": {"streaks": {"unlockedMilestones": [3]}}}))
            .unwrap();
        let profile = store.load_profile(&id).unwrap().unwrap();
        assert!(profile.achievements.streaks.unlocked_milestones.contains(7));
    }

    #[test]
    fn collections_are_scoped_to_user() {
        let store = SqliteStore::open_memory().unwrap();
        let a = UserId::new("a");
        store
            .save_collection(&a, &Collection::new("Calc", "", vec!["v1".into()], false))
            .unwrap();
        assert_eq!(store.collections(&a).unwrap().len(), 1);
        assert!(store.collections(&UserId::new("b")).unwrap().is_empty());
    }
}
