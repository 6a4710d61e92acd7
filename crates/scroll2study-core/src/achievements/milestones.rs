//! Achievement categories, counters and their milestone thresholds.

use serde::{Deserialize, Serialize};

use crate::profile::{MilestoneSet, UserProfile};

pub const VIDEO_MILESTONES: &[u32] = &[1, 10, 25, 50, 100, 200, 500];
pub const SUBJECT_MILESTONES: &[u32] = &[1, 5, 10, 25, 50, 100];
pub const STREAK_MILESTONES: &[u32] = &[3, 7, 14, 30, 60, 100, 365];
/// Watch-time milestones, in minutes.
pub const TIME_MILESTONES: &[u32] = &[60, 180, 300, 480, 720];
/// Shared by every social counter.
pub const SOCIAL_MILESTONES: &[u32] = &[5, 10, 25, 50, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    Videos,
    Subjects,
    Streaks,
    Time,
    Social,
    Special,
}

impl AchievementCategory {
    pub const ALL: [AchievementCategory; 6] = [
        Self::Videos,
        Self::Subjects,
        Self::Streaks,
        Self::Time,
        Self::Social,
        Self::Special,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Videos => "videos",
            Self::Subjects => "subjects",
            Self::Streaks => "streaks",
            Self::Time => "time",
            Self::Social => "social",
            Self::Special => "special",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialCounter {
    Collections,
    Notes,
    Shares,
    Groups,
    Helped,
}

impl SocialCounter {
    pub const ALL: [SocialCounter; 5] = [
        Self::Collections,
        Self::Notes,
        Self::Shares,
        Self::Groups,
        Self::Helped,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Collections => "collections",
            Self::Notes => "notes",
            Self::Shares => "shares",
            Self::Groups => "groups",
            Self::Helped => "helped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Collections => "Curator",
            Self::Notes => "Note Taker",
            Self::Shares => "Sharer",
            Self::Groups => "Study Buddy",
            Self::Helped => "Helper",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            Self::Collections => "collections created",
            Self::Notes => "notes written",
            Self::Shares => "videos shared",
            Self::Groups => "study groups joined",
            Self::Helped => "learners helped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialCounter {
    EarlyBird,
    NightOwl,
    Weekend,
    MultiSubject,
    PerfectWeek,
    SpeedLearning,
    DiverseLearning,
    FocusSession,
}

impl SpecialCounter {
    pub const ALL: [SpecialCounter; 8] = [
        Self::EarlyBird,
        Self::NightOwl,
        Self::Weekend,
        Self::MultiSubject,
        Self::PerfectWeek,
        Self::SpeedLearning,
        Self::DiverseLearning,
        Self::FocusSession,
    ];

    /// The single goal for this event counter.
    pub const fn goal(&self) -> u32 {
        match self {
            Self::EarlyBird | Self::NightOwl => 1,
            Self::Weekend => 4,
            Self::MultiSubject | Self::DiverseLearning => 5,
            Self::PerfectWeek => 7,
            Self::SpeedLearning => 3,
            Self::FocusSession => 2,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EarlyBird => "early_bird",
            Self::NightOwl => "night_owl",
            Self::Weekend => "weekend",
            Self::MultiSubject => "multi_subject",
            Self::PerfectWeek => "perfect_week",
            Self::SpeedLearning => "speed_learning",
            Self::DiverseLearning => "diverse_learning",
            Self::FocusSession => "focus_session",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::EarlyBird => "Early Bird",
            Self::NightOwl => "Night Owl",
            Self::Weekend => "Weekend Warrior",
            Self::MultiSubject => "Renaissance Day",
            Self::PerfectWeek => "Perfect Week",
            Self::SpeedLearning => "Speed Learner",
            Self::DiverseLearning => "Diverse Learner",
            Self::FocusSession => "Deep Focus",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::EarlyBird => "Study before 8 AM",
            Self::NightOwl => "Study after 10 PM",
            Self::Weekend => "Study on 4 weekend sessions",
            Self::MultiSubject => "Study 5 subjects in one day, 5 times",
            Self::PerfectWeek => "Keep a 7-day streak going, 7 times",
            Self::SpeedLearning => "Finish 3 videos within an hour, 3 times",
            Self::DiverseLearning => "Cover 5 subjects within a week, 5 times",
            Self::FocusSession => "Study for 2 hours straight, twice",
        }
    }
}

/// One counter the engine evaluates milestones against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    Videos,
    Subjects,
    Streak,
    WatchMinutes,
    Social(SocialCounter),
    Special(SpecialCounter),
}

impl Counter {
    /// Every counter, in display order.
    pub fn all() -> Vec<Counter> {
        let mut counters = vec![
            Counter::Videos,
            Counter::Subjects,
            Counter::Streak,
            Counter::WatchMinutes,
        ];
        counters.extend(SocialCounter::ALL.into_iter().map(Counter::Social));
        counters.extend(SpecialCounter::ALL.into_iter().map(Counter::Special));
        counters
    }

    pub fn category(&self) -> AchievementCategory {
        match self {
            Counter::Videos => AchievementCategory::Videos,
            Counter::Subjects => AchievementCategory::Subjects,
            Counter::Streak => AchievementCategory::Streaks,
            Counter::WatchMinutes => AchievementCategory::Time,
            Counter::Social(_) => AchievementCategory::Social,
            Counter::Special(_) => AchievementCategory::Special,
        }
    }

    /// Ascending milestone thresholds.
    pub fn thresholds(&self) -> &'static [u32] {
        match self {
            Counter::Videos => VIDEO_MILESTONES,
            Counter::Subjects => SUBJECT_MILESTONES,
            Counter::Streak => STREAK_MILESTONES,
            Counter::WatchMinutes => TIME_MILESTONES,
            Counter::Social(_) => SOCIAL_MILESTONES,
            Counter::Special(c) => match c {
                SpecialCounter::EarlyBird | SpecialCounter::NightOwl => &[1],
                SpecialCounter::Weekend => &[4],
                SpecialCounter::MultiSubject | SpecialCounter::DiverseLearning => &[5],
                SpecialCounter::PerfectWeek => &[7],
                SpecialCounter::SpeedLearning => &[3],
                SpecialCounter::FocusSession => &[2],
            },
        }
    }

    /// Raw counter value read from the profile.
    pub fn raw(&self, profile: &UserProfile) -> u64 {
        let achievements = &profile.achievements;
        match self {
            Counter::Videos => profile.stats.completed_video_count,
            Counter::Subjects => u64::from(achievements.subjects.completed_subjects),
            Counter::Streak => u64::from(profile.stats.study_streak),
            Counter::WatchMinutes => profile.stats.watch_minutes(),
            Counter::Social(c) => u64::from(achievements.social.count(*c)),
            Counter::Special(c) => u64::from(achievements.special.count(*c)),
        }
    }

    /// Persisted unlock set, if any thresholds were ever recorded.
    pub fn unlocked<'a>(&self, profile: &'a UserProfile) -> Option<&'a MilestoneSet> {
        let achievements = &profile.achievements;
        match self {
            Counter::Videos => Some(&achievements.videos.unlocked_milestones),
            Counter::Subjects => Some(&achievements.subjects.unlocked_milestones),
            Counter::Streak => Some(&achievements.streaks.unlocked_milestones),
            Counter::WatchMinutes => Some(&achievements.time.unlocked_milestones),
            Counter::Social(c) => achievements.social.unlocked_milestones.get(c),
            Counter::Special(c) => achievements.special.unlocked_milestones.get(c),
        }
    }

    pub fn unlocked_mut<'a>(&self, profile: &'a mut UserProfile) -> &'a mut MilestoneSet {
        let achievements = &mut profile.achievements;
        match self {
            Counter::Videos => &mut achievements.videos.unlocked_milestones,
            Counter::Subjects => &mut achievements.subjects.unlocked_milestones,
            Counter::Streak => &mut achievements.streaks.unlocked_milestones,
            Counter::WatchMinutes => &mut achievements.time.unlocked_milestones,
            Counter::Social(c) => achievements.social.unlocked_milestones.entry(*c).or_default(),
            Counter::Special(c) => achievements.special.unlocked_milestones.entry(*c).or_default(),
        }
    }

    /// Stable identifier for a milestone of this counter.
    pub fn milestone_id(&self, threshold: u32) -> String {
        match self {
            Counter::Videos => format!("videos_{threshold}"),
            Counter::Subjects => format!("subjects_{threshold}"),
            Counter::Streak => format!("streak_{threshold}"),
            Counter::WatchMinutes => format!("time_{threshold}"),
            Counter::Social(c) => format!("social_{}_{threshold}", c.as_str()),
            Counter::Special(c) => format!("special_{}", c.as_str()),
        }
    }

    pub fn title(&self, threshold: u32) -> String {
        match self {
            Counter::Videos => format!("{threshold} Videos"),
            Counter::Subjects => format!("{threshold} Subjects Mastered"),
            Counter::Streak => format!("{threshold}-Day Streak"),
            Counter::WatchMinutes => format!("{} Hours Watched", f64::from(threshold) / 60.0),
            Counter::Social(c) => format!("{} {threshold}", c.title()),
            Counter::Special(c) => c.title().to_string(),
        }
    }

    pub fn description(&self, threshold: u32) -> String {
        match self {
            Counter::Videos => format!("Complete {threshold} videos"),
            Counter::Subjects => format!("Complete every level of {threshold} subjects"),
            Counter::Streak => format!("Study {threshold} days in a row"),
            Counter::WatchMinutes => format!("Watch {threshold} minutes of lessons"),
            Counter::Social(c) => format!("Reach {threshold} {}", c.noun()),
            Counter::Special(c) => c.description().to_string(),
        }
    }
}
