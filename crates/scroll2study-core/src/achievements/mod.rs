//! Achievement engine.
//!
//! Six categories of milestones (videos, subjects, streaks, time, social,
//! special) evaluated against counters on the user profile. Projection for
//! display is pure; unlocking and session tracking mutate the profile
//! in memory and leave persistence to the caller.

mod engine;
mod milestones;
mod session;

pub use engine::{achievements, achievements_in, unlock_reached, Achievement, UnlockedMilestone};
pub use milestones::{
    AchievementCategory, Counter, SocialCounter, SpecialCounter, SOCIAL_MILESTONES,
    STREAK_MILESTONES, SUBJECT_MILESTONES, TIME_MILESTONES, VIDEO_MILESTONES,
};
pub use session::{apply_session, SessionOutcome, StudySession, TrackingRules};
