//! Per-user profile document: schema, fail-closed decoding and
//! merge-write patches.

pub mod document;
mod types;

pub use document::{diff_patch, merge_patch, merge_profile_patch};
pub use types::{
    AchievementRecords, MilestoneSet, Preferences, ProfileInfo, Settings, SocialAchievements,
    SpecialAchievements, StreakAchievements, SubjectAchievements, TimeAchievements, UserId,
    UserProfile, UserStats, VideoAchievements,
};
