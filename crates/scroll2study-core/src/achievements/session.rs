//! Study-session side effects on the achievement counters.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::milestones::SpecialCounter;
use crate::error::ConfigError;
use crate::profile::UserProfile;
use crate::streak::{StreakState, StreakTransition};

/// Days of per-day subject history kept on the profile.
const STUDY_DAY_RETENTION: u32 = 31;

/// Thresholds for the session-driven special counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingRules {
    /// Sessions starting before this local hour count as early-bird.
    #[serde(default = "default_early_bird_before_hour")]
    pub early_bird_before_hour: u32,
    /// Sessions starting at or after this local hour count as night-owl.
    #[serde(default = "default_night_owl_from_hour")]
    pub night_owl_from_hour: u32,
    #[serde(default = "default_focus_session_min_seconds")]
    pub focus_session_min_seconds: u64,
    #[serde(default = "default_speed_session_max_seconds")]
    pub speed_session_max_seconds: u64,
    /// Videos completed since the previous session needed for speed-learning.
    #[serde(default = "default_speed_min_new_videos")]
    pub speed_min_new_videos: u64,
    /// Distinct subjects in one day for a multi-subject day.
    #[serde(default = "default_subject_spread")]
    pub multi_subject_min: usize,
    /// Distinct subjects inside the diverse window for a diverse-learning day.
    #[serde(default = "default_subject_spread")]
    pub diverse_subject_min: usize,
    #[serde(default = "default_diverse_window_days")]
    pub diverse_window_days: u32,
}

fn default_early_bird_before_hour() -> u32 {
    8
}
fn default_night_owl_from_hour() -> u32 {
    22
}
fn default_focus_session_min_seconds() -> u64 {
    7200
}
fn default_speed_session_max_seconds() -> u64 {
    3600
}
fn default_speed_min_new_videos() -> u64 {
    3
}
fn default_subject_spread() -> usize {
    5
}
fn default_diverse_window_days() -> u32 {
    7
}

impl Default for TrackingRules {
    fn default() -> Self {
        Self {
            early_bird_before_hour: default_early_bird_before_hour(),
            night_owl_from_hour: default_night_owl_from_hour(),
            focus_session_min_seconds: default_focus_session_min_seconds(),
            speed_session_max_seconds: default_speed_session_max_seconds(),
            speed_min_new_videos: default_speed_min_new_videos(),
            multi_subject_min: default_subject_spread(),
            diverse_subject_min: default_subject_spread(),
            diverse_window_days: default_diverse_window_days(),
        }
    }
}

impl TrackingRules {
    /// Longest diverse window the kept per-day history can answer.
    pub const MAX_DIVERSE_WINDOW_DAYS: u32 = STUDY_DAY_RETENTION;

    /// Reject values the session rules cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=Self::MAX_DIVERSE_WINDOW_DAYS).contains(&self.diverse_window_days) {
            return Err(ConfigError::InvalidValue {
                key: "tracking.diverse_window_days".into(),
                message: format!(
                    "must be between 1 and {} days, got {}",
                    Self::MAX_DIVERSE_WINDOW_DAYS,
                    self.diverse_window_days
                ),
            });
        }
        Ok(())
    }

    fn diverse_window(&self) -> Duration {
        Duration::days(i64::from(
            self.diverse_window_days.clamp(1, Self::MAX_DIVERSE_WINDOW_DAYS),
        ))
    }
}

/// A completed study session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    /// Start time carrying the user's local offset.
    pub started_at: DateTime<FixedOffset>,
    pub duration_seconds: u64,
    pub subjects: BTreeSet<String>,
}

impl StudySession {
    pub fn new(
        started_at: DateTime<FixedOffset>,
        duration_seconds: u64,
        subjects: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            started_at,
            duration_seconds,
            subjects: subjects.into_iter().collect(),
        }
    }

    /// Local calendar day the session started on.
    pub fn local_date(&self) -> NaiveDate {
        self.started_at.date_naive()
    }
}

/// Which counters a session moved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    pub incremented: Vec<SpecialCounter>,
    pub longest_session_minutes: u64,
    pub streak: Option<StreakTransition>,
    pub study_streak: u32,
}

/// Apply every session rule to `profile`, in order:
/// early-bird, night-owl, weekend, multi-subject day, diverse learning,
/// focus, speed-learning, longest session, streak, perfect week.
pub fn apply_session(
    profile: &mut UserProfile,
    session: &StudySession,
    rules: &TrackingRules,
) -> SessionOutcome {
    let mut outcome = SessionOutcome::default();
    let local = session.started_at;
    let day = session.local_date();
    let special = &mut profile.achievements.special;
    let mut bump = |counter: SpecialCounter, outcome: &mut SessionOutcome| {
        special.increment(counter);
        outcome.incremented.push(counter);
    };

    if local.hour() < rules.early_bird_before_hour {
        bump(SpecialCounter::EarlyBird, &mut outcome);
    }
    if local.hour() >= rules.night_owl_from_hour {
        bump(SpecialCounter::NightOwl, &mut outcome);
    }
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        bump(SpecialCounter::Weekend, &mut outcome);
    }

    let window_start = day - (rules.diverse_window() - Duration::days(1));
    let window_before = distinct_subjects(&profile.study_days, window_start, day);
    let (day_before, day_after) = record_subjects(&mut profile.study_days, day, &session.subjects);
    if day_before < rules.multi_subject_min && day_after >= rules.multi_subject_min {
        bump(SpecialCounter::MultiSubject, &mut outcome);
    }

    let window_after = distinct_subjects(&profile.study_days, window_start, day);
    if window_before < rules.diverse_subject_min && window_after >= rules.diverse_subject_min {
        bump(SpecialCounter::DiverseLearning, &mut outcome);
    }

    if session.duration_seconds >= rules.focus_session_min_seconds {
        bump(SpecialCounter::FocusSession, &mut outcome);
    }

    let completed = profile.stats.completed_video_count;
    let new_videos = completed.saturating_sub(profile.achievements.videos.completed_videos);
    if session.duration_seconds <= rules.speed_session_max_seconds
        && new_videos >= rules.speed_min_new_videos
    {
        bump(SpecialCounter::SpeedLearning, &mut outcome);
    }
    profile.achievements.videos.completed_videos = completed;

    let minutes = session.duration_seconds / 60;
    let time = &mut profile.achievements.time;
    time.longest_session_minutes = time.longest_session_minutes.max(minutes);
    outcome.longest_session_minutes = time.longest_session_minutes;

    let mut streak = StreakState::new(
        profile.stats.study_streak,
        profile.achievements.streaks.longest_streak,
        profile.stats.last_study_date,
    );
    let transition = streak.record(day);
    profile.stats.study_streak = streak.current;
    profile.stats.last_study_date = streak.last_study_date;
    profile.achievements.streaks.longest_streak = streak.longest;
    outcome.streak = Some(transition);
    outcome.study_streak = streak.current;

    if transition != StreakTransition::SameDay && streak.current > 0 && streak.current % 7 == 0 {
        profile.achievements.special.increment(SpecialCounter::PerfectWeek);
        outcome.incremented.push(SpecialCounter::PerfectWeek);
    }

    prune_study_days(&mut profile.study_days, day);

    debug!(
        user = %profile.id,
        %day,
        incremented = ?outcome.incremented,
        streak = outcome.study_streak,
        "study session applied"
    );
    outcome
}

/// Union the session's subjects into the day's set. Returns the set size
/// before and after.
fn record_subjects(
    days: &mut BTreeMap<NaiveDate, BTreeSet<String>>,
    day: NaiveDate,
    subjects: &BTreeSet<String>,
) -> (usize, usize) {
    let studied = days.entry(day).or_default();
    let before = studied.len();
    studied.extend(subjects.iter().cloned());
    (before, studied.len())
}

/// Distinct subjects studied in `[from, to]`.
fn distinct_subjects(
    days: &BTreeMap<NaiveDate, BTreeSet<String>>,
    from: NaiveDate,
    to: NaiveDate,
) -> usize {
    days.range(from..=to)
        .flat_map(|(_, subjects)| subjects.iter())
        .collect::<BTreeSet<_>>()
        .len()
}

fn prune_study_days(
    days: &mut BTreeMap<NaiveDate, BTreeSet<String>>,
    today: NaiveDate,
) {
    let cutoff = today - Duration::days(i64::from(STUDY_DAY_RETENTION));
    days.retain(|day, _| *day > cutoff);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::UserId;
    use chrono::{TimeZone, Utc};

    fn profile() -> UserProfile {
        UserProfile::new(UserId::new("u1"), false, Utc::now())
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
    }

    fn subjects(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn early_focus_session_on_weekday() {
        // 2024-01-17 is a Wednesday
        let mut p = profile();
        let session = StudySession::new(at(2024, 1, 17, 7), 8000, subjects(&["math"]));
        let outcome = apply_session(&mut p, &session, &TrackingRules::default());

        let special = &p.achievements.special;
        assert_eq!(special.early_bird_sessions, 1);
        assert_eq!(special.focus_sessions, 1);
        assert_eq!(special.night_owl_sessions, 0);
        assert_eq!(special.weekend_sessions, 0);
        assert_eq!(p.stats.study_streak, 1);
        assert_eq!(p.achievements.time.longest_session_minutes, 133);
        assert_eq!(outcome.streak, Some(StreakTransition::Started));
    }

    #[test]
    fn hour_uses_local_offset_not_utc() {
        // 21:00 UTC is 23:00 at +02:00
        let mut p = profile();
        let session = StudySession::new(at(2024, 1, 17, 23), 600, subjects(&["art"]));
        apply_session(&mut p, &session, &TrackingRules::default());
        assert_eq!(p.achievements.special.night_owl_sessions, 1);
    }

    #[test]
    fn weekend_session_counts() {
        // 2024-01-20 is a Saturday
        let mut p = profile();
        let session = StudySession::new(at(2024, 1, 20, 12), 600, subjects(&["art"]));
        apply_session(&mut p, &session, &TrackingRules::default());
        assert_eq!(p.achievements.special.weekend_sessions, 1);
    }

    #[test]
    fn multi_subject_day_counts_once_per_day() {
        let mut p = profile();
        let rules = TrackingRules::default();
        let day = |h| at(2024, 1, 17, h);

        apply_session(&mut p, &StudySession::new(day(9), 600, subjects(&["a", "b", "c"])), &rules);
        assert_eq!(p.achievements.special.multi_subject_days, 0);

        apply_session(&mut p, &StudySession::new(day(10), 600, subjects(&["c", "d", "e"])), &rules);
        assert_eq!(p.achievements.special.multi_subject_days, 1);

        apply_session(&mut p, &StudySession::new(day(11), 600, subjects(&["f"])), &rules);
        assert_eq!(p.achievements.special.multi_subject_days, 1);
    }

    #[test]
    fn selected_subject_preferences_do_not_count() {
        let mut p = profile();
        p.preferences.selected_subjects = subjects(&["a", "b", "c", "d", "e"]);
        apply_session(
            &mut p,
            &StudySession::new(at(2024, 1, 17, 9), 600, subjects(&["a"])),
            &TrackingRules::default(),
        );
        assert_eq!(p.achievements.special.multi_subject_days, 0);
    }

    #[test]
    fn diverse_learning_spans_the_week() {
        let mut p = profile();
        let rules = TrackingRules::default();
        for (i, s) in ["a", "b", "c", "d"].iter().enumerate() {
            apply_session(
                &mut p,
                &StudySession::new(at(2024, 1, 10 + i as u32, 9), 600, subjects(&[s])),
                &rules,
            );
        }
        assert_eq!(p.achievements.special.diverse_learning_days, 0);

        apply_session(&mut p, &StudySession::new(at(2024, 1, 14, 9), 600, subjects(&["e"])), &rules);
        assert_eq!(p.achievements.special.diverse_learning_days, 1);

        apply_session(&mut p, &StudySession::new(at(2024, 1, 14, 10), 600, subjects(&["f"])), &rules);
        assert_eq!(p.achievements.special.diverse_learning_days, 1);
    }

    #[test]
    fn oversized_diverse_window_is_capped_to_kept_history() {
        let mut p = profile();
        let rules = TrackingRules { diverse_window_days: 1_000_000_000, ..TrackingRules::default() };
        assert!(rules.validate().is_err());

        // the two oldest days fall out of the 31-day history
        for (i, s) in ["a", "b", "c", "d"].iter().enumerate() {
            apply_session(
                &mut p,
                &StudySession::new(at(2024, 1, 1 + i as u32, 9), 600, subjects(&[s])),
                &rules,
            );
        }
        apply_session(&mut p, &StudySession::new(at(2024, 2, 2, 9), 600, subjects(&["e"])), &rules);
        assert_eq!(p.achievements.special.diverse_learning_days, 0);

        apply_session(&mut p, &StudySession::new(at(2024, 2, 2, 10), 600, subjects(&["f", "g"])), &rules);
        assert_eq!(p.achievements.special.diverse_learning_days, 1);
    }

    #[test]
    fn window_bounds_are_validated() {
        for days in [1, 7, TrackingRules::MAX_DIVERSE_WINDOW_DAYS] {
            let rules = TrackingRules { diverse_window_days: days, ..TrackingRules::default() };
            assert!(rules.validate().is_ok(), "{days}");
        }
        for days in [0, TrackingRules::MAX_DIVERSE_WINDOW_DAYS + 1] {
            let rules = TrackingRules { diverse_window_days: days, ..TrackingRules::default() };
            assert!(rules.validate().is_err(), "{days}");
        }
    }

    #[test]
    fn speed_learning_needs_new_videos_since_last_session() {
        let mut p = profile();
        let rules = TrackingRules::default();
        p.stats.completed_video_count = 3;
        apply_session(&mut p, &StudySession::new(at(2024, 1, 17, 9), 1800, subjects(&["a"])), &rules);
        assert_eq!(p.achievements.special.speed_learning_sessions, 1);
        assert_eq!(p.achievements.videos.completed_videos, 3);

        p.stats.completed_video_count = 4;
        apply_session(&mut p, &StudySession::new(at(2024, 1, 17, 10), 1800, subjects(&["a"])), &rules);
        assert_eq!(p.achievements.special.speed_learning_sessions, 1);
    }

    #[test]
    fn long_session_is_not_speed_learning() {
        let mut p = profile();
        p.stats.completed_video_count = 10;
        apply_session(
            &mut p,
            &StudySession::new(at(2024, 1, 17, 9), 3601, subjects(&["a"])),
            &TrackingRules::default(),
        );
        assert_eq!(p.achievements.special.speed_learning_sessions, 0);
    }

    #[test]
    fn longest_session_only_grows() {
        let mut p = profile();
        let rules = TrackingRules::default();
        apply_session(&mut p, &StudySession::new(at(2024, 1, 17, 9), 3000, subjects(&["a"])), &rules);
        apply_session(&mut p, &StudySession::new(at(2024, 1, 17, 12), 600, subjects(&["a"])), &rules);
        assert_eq!(p.achievements.time.longest_session_minutes, 50);
    }

    #[test]
    fn seventh_consecutive_day_is_a_perfect_week() {
        let mut p = profile();
        let rules = TrackingRules::default();
        for d in 1..=7 {
            apply_session(&mut p, &StudySession::new(at(2024, 1, d, 12), 600, subjects(&["a"])), &rules);
        }
        assert_eq!(p.stats.study_streak, 7);
        assert_eq!(p.achievements.special.perfect_weeks, 1);

        apply_session(&mut p, &StudySession::new(at(2024, 1, 7, 18), 600, subjects(&["a"])), &rules);
        assert_eq!(p.achievements.special.perfect_weeks, 1);
    }

    #[test]
    fn old_study_days_are_pruned() {
        let mut p = profile();
        let rules = TrackingRules::default();
        apply_session(&mut p, &StudySession::new(at(2024, 1, 1, 12), 600, subjects(&["a"])), &rules);
        apply_session(&mut p, &StudySession::new(at(2024, 3, 1, 12), 600, subjects(&["a"])), &rules);
        assert_eq!(p.study_days.len(), 1);
    }
}
