//! User-owned video collections (saved playlists).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub description: String,
    pub video_ids: Vec<String>,
    pub is_ai_generated: bool,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        video_ids: Vec<String>,
        is_ai_generated: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            video_ids,
            is_ai_generated,
            created_at: Utc::now(),
        }
    }
}
