mod config;
pub mod database;
pub mod memory;
pub mod migrations;

pub use config::{AiConfig, CatalogConfig, Config};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use serde_json::Value;

use crate::catalog::Catalog;
use crate::collection::Collection;
use crate::error::Result;
use crate::profile::{UserId, UserProfile};
use crate::progress::ProgressRecord;

/// Document store backing every tracking operation.
///
/// Profile writes go through [`ProfileStore::merge_profile`] so that
/// writers touching disjoint fields never overwrite each other. There is
/// no version token: two read-modify-write cycles on the same fields can
/// still race, and the later write wins. Milestone sets are the exception:
/// stored and patched `unlockedMilestones` arrays are unioned, so a stale
/// writer cannot drop a recorded unlock.
pub trait ProfileStore: Send {
    fn load_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>>;

    /// Insert a profile unless one already exists. Returns `true` if inserted.
    fn create_profile(&self, profile: &UserProfile) -> Result<bool>;

    /// Apply a JSON merge patch to a stored profile. The merged document
    /// must still decode; otherwise nothing is written.
    fn merge_profile(&self, user_id: &UserId, patch: &Value) -> Result<()> {
        self.merge_profile_counting(user_id, patch, &[])
    }

    /// [`merge_profile`](Self::merge_profile), and flag the completion
    /// records of `video_ids` as counted in the same write.
    ///
    /// Fails with [`DatabaseError::Conflict`](crate::error::DatabaseError::Conflict)
    /// and writes nothing if any of them is missing or already counted.
    fn merge_profile_counting(&self, user_id: &UserId, patch: &Value, video_ids: &[String]) -> Result<()>;

    /// Store an uncounted completion marker. Returns `false` if one
    /// already existed.
    fn record_progress(&self, record: &ProgressRecord) -> Result<bool>;

    fn progress_records(&self, user_id: &UserId) -> Result<Vec<ProgressRecord>>;

    /// Subjects, levels and videos, videos in insertion order.
    fn load_catalog(&self) -> Result<Catalog>;

    /// Replace the whole catalog.
    fn replace_catalog(&self, catalog: &Catalog) -> Result<()>;

    fn save_collection(&self, user_id: &UserId, collection: &Collection) -> Result<()>;

    fn collections(&self, user_id: &UserId) -> Result<Vec<Collection>>;
}

/// Returns `~/.config/scroll2study[-dev]/` based on SCROLL2STUDY_ENV.
///
/// Set SCROLL2STUDY_ENV=dev to use the development data directory, or
/// SCROLL2STUDY_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("SCROLL2STUDY_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("SCROLL2STUDY_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("scroll2study-dev")
            } else {
                base_dir.join("scroll2study")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
