//! Study service: the tracking operations, bound to one signed-in session.
//!
//! Every write is a read-modify-write over the profile document. The
//! service loads the stored profile, applies the change in memory, and
//! sends only the changed fields back through
//! [`ProfileStore::merge_profile`]. The session is checked before each
//! write, so an operation that outlives a sign-out is abandoned without
//! touching the store.
//!
//! A watch is stored as an uncounted completion record first. It is added
//! to the profile's video counters by a later merge that also flags the
//! record as counted, so a failed merge leaves the watch pending and the
//! next `mark_watched` (or `ensure_profile`) picks it up.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::achievements::{
    achievements, achievements_in, apply_session, unlock_reached, Achievement,
    AchievementCategory, SessionOutcome, SocialCounter, StudySession, TrackingRules,
    UnlockedMilestone,
};
use crate::ai::AiClient;
use crate::auth::SessionHandle;
use crate::catalog::{Catalog, DuplicatePolicy, GridIndex};
use crate::collection::Collection;
use crate::error::{CoreError, Result};
use crate::profile::{diff_patch, Preferences, ProfileInfo, Settings, UserId, UserProfile};
use crate::progress::{ProgressMap, ProgressRecord};
use crate::snapshot::{Publisher, Subscription};
use crate::storage::{Config, ProfileStore};

/// Result of marking a video watched.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchOutcome {
    pub video_id: String,
    pub subject_id: String,
    pub level: u32,
    /// `false` when the video had already been completed.
    pub first_completion: bool,
}

pub struct StudyService<S: ProfileStore> {
    store: S,
    session: SessionHandle,
    rules: TrackingRules,
    policy: DuplicatePolicy,
    catalog: Publisher<GridIndex>,
    profile: Publisher<Option<UserProfile>>,
}

impl<S: ProfileStore> StudyService<S> {
    /// Build the service and load the catalog grid from the store.
    pub fn new(store: S, session: SessionHandle, config: &Config) -> Result<Self> {
        let index = GridIndex::from_catalog(&store.load_catalog()?, config.catalog.duplicate_policy)?;
        Ok(Self {
            store,
            session,
            rules: config.tracking.clone(),
            policy: config.catalog.duplicate_policy,
            catalog: Publisher::new(index),
            profile: Publisher::new(None),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn user_id(&self) -> &UserId {
        self.session.user_id()
    }

    pub fn rules(&self) -> &TrackingRules {
        &self.rules
    }

    /// The current catalog grid.
    pub fn catalog(&self) -> Arc<GridIndex> {
        self.catalog.current().value
    }

    pub fn subscribe_catalog(&self) -> Subscription<GridIndex> {
        self.catalog.subscribe()
    }

    /// Profile snapshots published after every successful write.
    pub fn subscribe_profile(&self) -> Subscription<Option<UserProfile>> {
        self.profile.subscribe()
    }

    /// Rebuild the grid from the stored catalog. Returns the new generation.
    pub fn refresh_catalog(&mut self) -> Result<u64> {
        let index = GridIndex::from_catalog(&self.store.load_catalog()?, self.policy)?;
        let generation = self.catalog.publish(index);
        info!(generation, cells = self.catalog.current().value.len(), "catalog refreshed");
        Ok(generation)
    }

    /// Validate a catalog against the duplicate policy, store it, and
    /// publish the rebuilt grid.
    pub fn import_catalog(&mut self, catalog: &Catalog) -> Result<u64> {
        let index = GridIndex::from_catalog(catalog, self.policy)?;
        self.store.replace_catalog(catalog)?;
        let generation = self.catalog.publish(index);
        info!(
            generation,
            subjects = catalog.subjects.len(),
            videos = catalog.videos.len(),
            "catalog imported"
        );
        Ok(generation)
    }

    pub fn profile(&self) -> Result<Option<UserProfile>> {
        self.store.load_profile(self.user_id())
    }

    /// Load the profile, creating a zeroed one on first sign-in.
    pub fn ensure_profile(&mut self) -> Result<UserProfile> {
        let identity = self.session.ensure_active()?.clone();
        if let Some(existing) = self.store.load_profile(&identity.user_id)? {
            return Ok(existing);
        }

        let profile = UserProfile::new(identity.user_id.clone(), identity.is_anonymous, Utc::now());
        if self.store.create_profile(&profile)? {
            info!(user = %identity.user_id, anonymous = identity.is_anonymous, "profile created");
            self.profile.publish(Some(profile.clone()));

            // watches recorded while the profile did not exist yet
            let index = self.catalog();
            if self.count_pending_watches(&index)? == 0 {
                return Ok(profile);
            }
        }

        // created by another writer since our read, or just credited with
        // watches recorded before it existed
        self.store
            .load_profile(&identity.user_id)?
            .ok_or_else(|| CoreError::not_found("profile", identity.user_id.as_str()))
    }

    /// Record a completed watch and update the profile's video counters.
    pub fn mark_watched(&mut self, video_id: &str) -> Result<WatchOutcome> {
        self.session.ensure_active()?;
        let index = self.catalog();
        let Some(item) = index.item(video_id) else {
            warn!(user = %self.user_id(), video = %video_id, "mark_watched: video not in catalog grid");
            return Err(CoreError::not_found("video", video_id));
        };

        let record = ProgressRecord::new(self.user_id().clone(), item.id.clone(), Utc::now());
        let first_completion = self.store.record_progress(&record)?;
        self.count_pending_watches(&index)?;

        Ok(WatchOutcome {
            video_id: item.id.clone(),
            subject_id: item.subject_id.clone(),
            level: item.complexity_level,
            first_completion,
        })
    }

    /// Watched cells for the signed-in user, joined against the current grid.
    pub fn progress(&self) -> Result<ProgressMap> {
        self.progress_map(&self.catalog())
    }

    /// Completed levels of `subject_id` over the global level count.
    pub fn subject_progress(&self, subject_id: &str) -> Result<f64> {
        let index = self.catalog();
        Ok(self.progress_map(&index)?.subject_progress(subject_id, &index))
    }

    pub fn current_level(&self) -> Result<u32> {
        let index = self.catalog();
        Ok(self.progress_map(&index)?.current_level(&index))
    }

    /// Apply a finished study session. `None` if the user has no profile.
    pub fn track_study_session(&mut self, session: &StudySession) -> Result<Option<SessionOutcome>> {
        let rules = self.rules.clone();
        self.write_profile(|p| apply_session(p, session, &rules))
    }

    /// Persist every newly reached milestone and return them.
    pub fn check_and_unlock_achievements(&mut self) -> Result<Vec<UnlockedMilestone>> {
        Ok(self.write_profile(unlock_reached)?.unwrap_or_default())
    }

    /// Display projection; empty when the user has no profile.
    pub fn achievements(&self, category: Option<AchievementCategory>) -> Result<Vec<Achievement>> {
        let Some(profile) = self.profile()? else {
            return Ok(Vec::new());
        };
        Ok(match category {
            Some(category) => achievements_in(&profile, category),
            None => achievements(&profile),
        })
    }

    /// Bump one social counter. Returns the new count.
    pub fn record_social(&mut self, counter: SocialCounter) -> Result<Option<u32>> {
        self.write_profile(|p| {
            let count = p.achievements.social.count_mut(counter);
            *count = count.saturating_add(1);
            *count
        })
    }

    pub fn update_profile_info(&mut self, info: ProfileInfo) -> Result<bool> {
        Ok(self.write_profile(|p| p.profile = info)?.is_some())
    }

    pub fn update_preferences(&mut self, preferences: Preferences) -> Result<bool> {
        Ok(self.write_profile(|p| p.preferences = preferences)?.is_some())
    }

    pub fn update_settings(&mut self, settings: Settings) -> Result<bool> {
        Ok(self.write_profile(|p| p.settings = settings)?.is_some())
    }

    /// Save a user collection. Every video id must be in the grid.
    pub fn create_collection(
        &mut self,
        name: &str,
        description: &str,
        video_ids: Vec<String>,
    ) -> Result<Collection> {
        let index = self.catalog();
        if let Some(unknown) = video_ids.iter().find(|id| index.item(id).is_none()) {
            return Err(CoreError::not_found("video", unknown.as_str()));
        }
        self.save_collection(Collection::new(name, description, video_ids, false))
    }

    /// Ask the AI service for a collection on `topic` and save it.
    ///
    /// Ids the model made up are dropped. A failed or malformed reply
    /// aborts before anything is written.
    pub async fn suggest_collection(&mut self, ai: &AiClient, topic: &str) -> Result<Collection> {
        self.session.ensure_active()?;
        let index = self.catalog();
        let videos: Vec<_> = index.items().into_iter().cloned().collect();
        let suggestion = ai.suggest_collection(topic, &videos).await?;

        let (known, unknown): (Vec<String>, Vec<String>) = suggestion
            .video_ids
            .into_iter()
            .partition(|id| index.item(id).is_some());
        if !unknown.is_empty() {
            warn!(?unknown, "AI suggestion referenced videos outside the catalog");
        }
        self.save_collection(Collection::new(suggestion.name, suggestion.description, known, true))
    }

    pub fn collections(&self) -> Result<Vec<Collection>> {
        self.store.collections(self.user_id())
    }

    /// End the session. Later writes fail with `NotAuthenticated`.
    pub fn sign_out(&self) {
        self.session.sign_out();
    }

    fn save_collection(&mut self, collection: Collection) -> Result<Collection> {
        self.session.ensure_active()?;
        self.store.save_collection(self.user_id(), &collection)?;
        self.record_social(SocialCounter::Collections)?;
        info!(user = %self.user_id(), id = %collection.id, ai = collection.is_ai_generated, "collection saved");
        Ok(collection)
    }

    /// Add every uncounted watch to the profile's video counters, flagging
    /// the records in the same store write. Returns how many were counted;
    /// zero when there is no profile yet.
    fn count_pending_watches(&mut self, index: &GridIndex) -> Result<usize> {
        let records = self.store.progress_records(self.user_id())?;
        let pending: Vec<&ProgressRecord> = records.iter().filter(|r| !r.counted).collect();
        if pending.is_empty() {
            return Ok(0);
        }

        // a video dropped from the grid since it was watched adds no time
        let seconds: u64 = pending
            .iter()
            .filter_map(|r| index.item(&r.video_id))
            .map(|item| item.duration_seconds)
            .sum();
        let videos: Vec<String> = pending.iter().map(|r| r.video_id.clone()).collect();
        let completed_subjects = ProgressMap::from_records(&records, index).completed_subjects(index);

        let counted = self.write_profile_counting(&videos, |p| {
            p.stats.completed_video_count += videos.len() as u64;
            p.stats.total_watch_time_seconds += seconds;
            p.achievements.subjects.completed_subjects = completed_subjects;
        })?;
        Ok(counted.map_or(0, |()| videos.len()))
    }

    fn progress_map(&self, index: &GridIndex) -> Result<ProgressMap> {
        let records = self.store.progress_records(self.user_id())?;
        Ok(ProgressMap::from_records(&records, index))
    }

    /// Load, modify and merge-write the profile.
    ///
    /// Returns `None` without writing when the user has no profile.
    fn write_profile<R>(&mut self, change: impl FnOnce(&mut UserProfile) -> R) -> Result<Option<R>> {
        self.write_profile_counting(&[], change)
    }

    /// [`write_profile`](Self::write_profile) that also flags the watches
    /// of `counted` videos in the same store write.
    fn write_profile_counting<R>(
        &mut self,
        counted: &[String],
        change: impl FnOnce(&mut UserProfile) -> R,
    ) -> Result<Option<R>> {
        self.session.ensure_active()?;
        let user_id = self.user_id().clone();
        let Some(mut profile) = self.store.load_profile(&user_id)? else {
            warn!(user = %user_id, "no profile stored; skipping write");
            return Ok(None);
        };

        let before = profile.to_document()?;
        let result = change(&mut profile);
        let mut after = profile.to_document()?;

        let patch = match diff_patch(&before, &after) {
            Some(patch) => Some(patch),
            None if !counted.is_empty() => Some(Value::Object(Map::new())),
            None => None,
        };
        if let Some(mut patch) = patch {
            profile.updated_at = Utc::now();
            after = profile.to_document()?;
            if let Some(updated_at) = after.get("updatedAt") {
                patch["updatedAt"] = updated_at.clone();
            }
            // the session may have ended while the change was computed
            self.session.ensure_active()?;
            self.store.merge_profile_counting(&user_id, &patch, counted)?;
            self.profile.publish(Some(profile));
        }

        Ok(Some(result))
    }
}
