//! Schema structs for the per-user profile document.
//!
//! Field names follow the document store's camelCase convention. Decoding
//! fails closed: a document missing a counter is rejected rather than read
//! back as zero, and unknown fields are rejected too. Only `Option` fields
//! (`avatarUrl`, `lastStudyDate`) may be absent.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::achievements::{SocialCounter, SpecialCounter};

/// Opaque, externally issued identity key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Append-only set of unlocked milestone thresholds.
///
/// There is deliberately no way to remove a threshold once inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MilestoneSet(BTreeSet<u32>);

impl MilestoneSet {
    /// Insert a threshold. Returns `true` if it was not already unlocked.
    pub fn unlock(&mut self, threshold: u32) -> bool {
        self.0.insert(threshold)
    }

    pub fn contains(&self, threshold: u32) -> bool {
        self.0.contains(&threshold)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileInfo {
    pub display_name: String,
    pub bio: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Preferences {
    pub selected_subjects: Vec<String>,
    pub daily_goal_minutes: u32,
    pub difficulty: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            selected_subjects: Vec::new(),
            daily_goal_minutes: 30,
            difficulty: "beginner".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    pub notifications_enabled: bool,
    pub autoplay: bool,
    pub dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            autoplay: true,
            dark_mode: false,
        }
    }
}

/// Aggregate study statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserStats {
    pub total_watch_time_seconds: u64,
    pub completed_video_count: u64,
    /// Current consecutive-day streak.
    pub study_streak: u32,
    /// Calendar date of the last study session, local to the user.
    pub last_study_date: Option<NaiveDate>,
}

impl UserStats {
    pub fn watch_minutes(&self) -> u64 {
        self.total_watch_time_seconds / 60
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VideoAchievements {
    /// Video count as of the last tracked study session.
    pub completed_videos: u64,
    pub unlocked_milestones: MilestoneSet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubjectAchievements {
    pub completed_subjects: u32,
    pub unlocked_milestones: MilestoneSet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StreakAchievements {
    pub longest_streak: u32,
    pub unlocked_milestones: MilestoneSet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimeAchievements {
    pub longest_session_minutes: u64,
    pub unlocked_milestones: MilestoneSet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SocialAchievements {
    pub collections_created: u32,
    pub notes_created: u32,
    pub shares: u32,
    pub groups_joined: u32,
    pub users_helped: u32,
    pub unlocked_milestones: BTreeMap<SocialCounter, MilestoneSet>,
}

impl SocialAchievements {
    pub fn count(&self, counter: SocialCounter) -> u32 {
        match counter {
            SocialCounter::Collections => self.collections_created,
            SocialCounter::Notes => self.notes_created,
            SocialCounter::Shares => self.shares,
            SocialCounter::Groups => self.groups_joined,
            SocialCounter::Helped => self.users_helped,
        }
    }

    pub fn count_mut(&mut self, counter: SocialCounter) -> &mut u32 {
        match counter {
            SocialCounter::Collections => &mut self.collections_created,
            SocialCounter::Notes => &mut self.notes_created,
            SocialCounter::Shares => &mut self.shares,
            SocialCounter::Groups => &mut self.groups_joined,
            SocialCounter::Helped => &mut self.users_helped,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SpecialAchievements {
    pub early_bird_sessions: u32,
    pub night_owl_sessions: u32,
    pub weekend_sessions: u32,
    pub multi_subject_days: u32,
    pub perfect_weeks: u32,
    pub speed_learning_sessions: u32,
    pub diverse_learning_days: u32,
    pub focus_sessions: u32,
    pub unlocked_milestones: BTreeMap<SpecialCounter, MilestoneSet>,
}

impl SpecialAchievements {
    pub fn count(&self, counter: SpecialCounter) -> u32 {
        match counter {
            SpecialCounter::EarlyBird => self.early_bird_sessions,
            SpecialCounter::NightOwl => self.night_owl_sessions,
            SpecialCounter::Weekend => self.weekend_sessions,
            SpecialCounter::MultiSubject => self.multi_subject_days,
            SpecialCounter::PerfectWeek => self.perfect_weeks,
            SpecialCounter::SpeedLearning => self.speed_learning_sessions,
            SpecialCounter::DiverseLearning => self.diverse_learning_days,
            SpecialCounter::FocusSession => self.focus_sessions,
        }
    }

    pub fn increment(&mut self, counter: SpecialCounter) {
        let slot = match counter {
            SpecialCounter::EarlyBird => &mut self.early_bird_sessions,
            SpecialCounter::NightOwl => &mut self.night_owl_sessions,
            SpecialCounter::Weekend => &mut self.weekend_sessions,
            SpecialCounter::MultiSubject => &mut self.multi_subject_days,
            SpecialCounter::PerfectWeek => &mut self.perfect_weeks,
            SpecialCounter::SpeedLearning => &mut self.speed_learning_sessions,
            SpecialCounter::DiverseLearning => &mut self.diverse_learning_days,
            SpecialCounter::FocusSession => &mut self.focus_sessions,
        };
        *slot = slot.saturating_add(1);
    }
}

/// The six independent achievement sub-records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AchievementRecords {
    pub videos: VideoAchievements,
    pub subjects: SubjectAchievements,
    pub streaks: StreakAchievements,
    pub time: TimeAchievements,
    pub social: SocialAchievements,
    pub special: SpecialAchievements,
}

/// Canonical per-user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserProfile {
    pub id: UserId,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub profile: ProfileInfo,
    pub preferences: Preferences,
    pub settings: Settings,
    pub stats: UserStats,
    pub achievements: AchievementRecords,
    /// Subjects studied per local calendar day, most recent days only.
    pub study_days: BTreeMap<NaiveDate, BTreeSet<String>>,
}

impl UserProfile {
    /// A freshly signed-in user: every counter zeroed.
    pub fn new(id: UserId, is_anonymous: bool, now: DateTime<Utc>) -> Self {
        Self {
            id,
            is_anonymous,
            created_at: now,
            updated_at: now,
            profile: ProfileInfo::default(),
            preferences: Preferences::default(),
            settings: Settings::default(),
            stats: UserStats::default(),
            achievements: AchievementRecords::default(),
            study_days: BTreeMap::new(),
        }
    }
}
