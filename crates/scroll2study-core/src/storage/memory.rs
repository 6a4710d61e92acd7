//! In-process store for tests and dry runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use super::ProfileStore;
use crate::catalog::Catalog;
use crate::collection::Collection;
use crate::error::{CoreError, DatabaseError, Result};
use crate::profile::{merge_profile_patch, UserId, UserProfile};
use crate::progress::ProgressRecord;

#[derive(Debug, Default)]
struct Inner {
    profiles: HashMap<UserId, Value>,
    progress: BTreeMap<(UserId, String), ProgressRecord>,
    catalog: Catalog,
    collections: HashMap<UserId, Vec<Collection>>,
    merges: usize,
    failing_merges: usize,
}

/// Store that keeps every document in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        let store = Self::default();
        store.lock().catalog = catalog;
        store
    }

    /// Number of successful profile merges so far.
    pub fn merge_count(&self) -> usize {
        self.lock().merges
    }

    /// Make the next `count` profile merges fail as if the store were
    /// unreachable. Nothing is written by a failed merge.
    pub fn fail_next_merges(&self, count: usize) {
        self.lock().failing_merges = count;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProfileStore for MemoryStore {
    fn load_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        self.lock()
            .profiles
            .get(user_id)
            .map(UserProfile::from_document)
            .transpose()
    }

    fn create_profile(&self, profile: &UserProfile) -> Result<bool> {
        let mut inner = self.lock();
        if inner.profiles.contains_key(&profile.id) {
            return Ok(false);
        }
        inner.profiles.insert(profile.id.clone(), profile.to_document()?);
        Ok(true)
    }

    fn merge_profile_counting(&self, user_id: &UserId, patch: &Value, video_ids: &[String]) -> Result<()> {
        let mut inner = self.lock();
        if inner.failing_merges > 0 {
            inner.failing_merges -= 1;
            return Err(CoreError::remote("store", Some(503), "unavailable"));
        }
        let Some(stored) = inner.profiles.get(user_id) else {
            return Err(CoreError::not_found("profile", user_id.as_str()));
        };
        let mut doc = stored.clone();
        merge_profile_patch(&mut doc, patch);
        UserProfile::from_document(&doc)?;

        for video_id in video_ids {
            let key = (user_id.clone(), video_id.clone());
            if inner.progress.get(&key).map_or(true, |r| r.counted) {
                return Err(DatabaseError::Conflict(format!("watch of '{video_id}' already counted")).into());
            }
        }
        for video_id in video_ids {
            if let Some(record) = inner.progress.get_mut(&(user_id.clone(), video_id.clone())) {
                record.counted = true;
            }
        }
        inner.profiles.insert(user_id.clone(), doc);
        inner.merges += 1;
        Ok(())
    }

    fn record_progress(&self, record: &ProgressRecord) -> Result<bool> {
        let key = (record.user_id.clone(), record.video_id.clone());
        let mut inner = self.lock();
        if inner.progress.contains_key(&key) {
            return Ok(false);
        }
        inner.progress.insert(key, ProgressRecord { counted: false, ..record.clone() });
        Ok(true)
    }

    fn progress_records(&self, user_id: &UserId) -> Result<Vec<ProgressRecord>> {
        Ok(self
            .lock()
            .progress
            .values()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect())
    }

    fn load_catalog(&self) -> Result<Catalog> {
        Ok(self.lock().catalog.clone())
    }

    fn replace_catalog(&self, catalog: &Catalog) -> Result<()> {
        self.lock().catalog = catalog.clone();
        Ok(())
    }

    fn save_collection(&self, user_id: &UserId, collection: &Collection) -> Result<()> {
        let mut inner = self.lock();
        let list = inner.collections.entry(user_id.clone()).or_default();
        list.retain(|c| c.id != collection.id);
        list.push(collection.clone());
        Ok(())
    }

    fn collections(&self, user_id: &UserId) -> Result<Vec<Collection>> {
        Ok(self
            .lock()
            .collections
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn merge_rejects_invalid_result_without_writing() {
        let store = MemoryStore::new();
        let id = UserId::new("u1");
        store
            .create_profile(&UserProfile::new(id.clone(), false, Utc::now()))
            .unwrap();

        assert!(store.merge_profile(&id, &json!({"stats": null})).is_err());
        assert_eq!(store.merge_count(), 0);
        assert!(store.load_profile(&id).unwrap().is_some());
    }

    #[test]
    fn counting_merge_flags_records_once() {
        let store = MemoryStore::new();
        let id = UserId::new("u1");
        store
            .create_profile(&UserProfile::new(id.clone(), false, Utc::now()))
            .unwrap();
        store.record_progress(&ProgressRecord::new(id.clone(), "v1", Utc::now())).unwrap();

        let patch = json!({"stats": {"completedVideoCount": 1}});
        store.merge_profile_counting(&id, &patch, &["v1".into()]).unwrap();
        assert!(store.progress_records(&id).unwrap()[0].counted);

        let err = store
            .merge_profile_counting(&id, &json!({"stats": {"completedVideoCount": 2}}), &["v1".into()])
            .unwrap_err();
        assert!(matches!(err, CoreError::Database(DatabaseError::Conflict(_))));
        assert_eq!(store.load_profile(&id).unwrap().unwrap().stats.completed_video_count, 1);
    }

    #[test]
    fn failed_merge_writes_nothing() {
        let store = MemoryStore::new();
        let id = UserId::new("u1");
        store
            .create_profile(&UserProfile::new(id.clone(), false, Utc::now()))
            .unwrap();
        store.fail_next_merges(1);
        assert!(matches!(
            store.merge_profile(&id, &json!({"settings": {"darkMode": true}})),
            Err(CoreError::Remote { .. })
        ));
        assert!(!store.load_profile(&id).unwrap().unwrap().settings.dark_mode);
        store.merge_profile(&id, &json!({"settings": {"darkMode": true}})).unwrap();
        assert_eq!(store.merge_count(), 1);
    }

    #[test]
    fn progress_is_per_user() {
        let store = MemoryStore::new();
        for user in ["a", "b"] {
            store
                .record_progress(&ProgressRecord::new(UserId::new(user), "v1", Utc::now()))
                .unwrap();
        }
        assert_eq!(store.progress_records(&UserId::new("a")).unwrap().len(), 1);
    }
}
