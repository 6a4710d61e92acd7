//! Achievement projection and unlock persistence.
//!
//! [`achievements`] is a pure read-side projection for display.
//! [`unlock_reached`] is the only function that mutates unlock state.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::milestones::{AchievementCategory, Counter};
use crate::profile::UserProfile;

/// Display view of one (counter, milestone) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub category: AchievementCategory,
    pub title: String,
    pub description: String,
    pub goal: u32,
    /// Raw counter capped at the goal.
    pub current: u32,
    /// `min(raw / goal, 1.0)`.
    pub progress: f64,
    /// The counter currently meets the goal.
    pub unlocked: bool,
    /// The milestone is in the persisted unlock set. Stays true after
    /// the counter drops below the goal.
    pub recorded: bool,
}

/// A threshold that [`unlock_reached`] just added to an unlock set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedMilestone {
    pub id: String,
    pub category: AchievementCategory,
    pub threshold: u32,
}

/// Project every milestone of every counter into display views.
pub fn achievements(profile: &UserProfile) -> Vec<Achievement> {
    Counter::all()
        .into_iter()
        .flat_map(|counter| {
            let raw = counter.raw(profile);
            let recorded = counter.unlocked(profile);
            counter.thresholds().iter().map(move |&goal| {
                let progress = (raw as f64 / f64::from(goal)).min(1.0);
                Achievement {
                    id: counter.milestone_id(goal),
                    category: counter.category(),
                    title: counter.title(goal),
                    description: counter.description(goal),
                    goal,
                    current: raw.min(u64::from(goal)) as u32,
                    progress,
                    unlocked: progress >= 1.0,
                    recorded: recorded.is_some_and(|set| set.contains(goal)),
                }
            })
        })
        .collect()
}

/// Project a single category.
pub fn achievements_in(profile: &UserProfile, category: AchievementCategory) -> Vec<Achievement> {
    achievements(profile)
        .into_iter()
        .filter(|a| a.category == category)
        .collect()
}

/// Add every threshold the current counters meet to the matching unlock
/// set. Returns only the thresholds that were not already recorded.
pub fn unlock_reached(profile: &mut UserProfile) -> Vec<UnlockedMilestone> {
    let mut newly_unlocked = Vec::new();

    for counter in Counter::all() {
        let raw = counter.raw(profile);
        let reached: Vec<u32> = counter
            .thresholds()
            .iter()
            .copied()
            .filter(|&t| raw >= u64::from(t))
            .collect();
        if reached.is_empty() {
            continue;
        }

        let set = counter.unlocked_mut(profile);
        for threshold in reached {
            if set.unlock(threshold) {
                newly_unlocked.push(UnlockedMilestone {
                    id: counter.milestone_id(threshold),
                    category: counter.category(),
                    threshold,
                });
            }
        }
    }

    for milestone in &newly_unlocked {
        info!(user = %profile.id, milestone = %milestone.id, "achievement unlocked");
    }
    newly_unlocked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::{SocialCounter, SpecialCounter};
    use crate::profile::UserId;
    use chrono::Utc;
    use proptest::prelude::*;

    fn profile() -> UserProfile {
        UserProfile::new(UserId::new("u1"), false, Utc::now())
    }

    fn find<'a>(list: &'a [Achievement], id: &str) -> &'a Achievement {
        list.iter().find(|a| a.id == id).unwrap()
    }

    #[test]
    fn zero_profile_has_nothing_unlocked() {
        let list = achievements(&profile());
        assert_eq!(list.len(), 7 + 6 + 7 + 5 + 5 * 5 + 8);
        assert!(list.iter().all(|a| !a.unlocked && a.progress == 0.0 && a.current == 0));
    }

    #[test]
    fn progress_is_capped_fraction() {
        let mut p = profile();
        p.stats.completed_video_count = 30;
        let list = achievements(&p);

        let ten = find(&list, "videos_10");
        assert_eq!(ten.current, 10);
        assert_eq!(ten.progress, 1.0);
        assert!(ten.unlocked);

        let fifty = find(&list, "videos_50");
        assert_eq!(fifty.current, 30);
        assert!((fifty.progress - 0.6).abs() < 1e-9);
        assert!(!fifty.unlocked);
    }

    #[test]
    fn time_category_uses_whole_minutes() {
        let mut p = profile();
        p.stats.total_watch_time_seconds = 3659;
        let hour = find(&achievements(&p), "time_60").clone();
        assert_eq!(hour.current, 60);
        assert!(hour.unlocked);

        p.stats.total_watch_time_seconds = 3599;
        let hour = find(&achievements(&p), "time_60").clone();
        assert_eq!(hour.current, 59);
        assert!(!hour.unlocked);
    }

    #[test]
    fn social_counters_share_thresholds() {
        let mut p = profile();
        p.achievements.social.notes_created = 12;
        let list = achievements_in(&p, AchievementCategory::Social);
        assert!(find(&list, "social_notes_10").unlocked);
        assert!(!find(&list, "social_notes_25").unlocked);
        assert!(!find(&list, "social_shares_5").unlocked);
    }

    #[test]
    fn special_counters_have_single_goal() {
        let mut p = profile();
        p.achievements.special.weekend_sessions = 2;
        let weekend = find(&achievements(&p), "special_weekend").clone();
        assert_eq!(weekend.goal, 4);
        assert_eq!(weekend.progress, 0.5);
    }

    #[test]
    fn unlock_records_reached_thresholds_once() {
        let mut p = profile();
        p.stats.completed_video_count = 12;
        let first = unlock_reached(&mut p);
        let ids: Vec<&str> = first.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["videos_1", "videos_10"]);

        assert!(unlock_reached(&mut p).is_empty());
    }

    #[test]
    fn unlocks_survive_streak_reset() {
        let mut p = profile();
        p.stats.study_streak = 8;
        unlock_reached(&mut p);
        p.stats.study_streak = 1;
        unlock_reached(&mut p);

        let set = &p.achievements.streaks.unlocked_milestones;
        assert!(set.contains(3) && set.contains(7));

        let seven = find(&achievements(&p), "streak_7").clone();
        assert!(seven.recorded);
        assert!(!seven.unlocked);
        assert_eq!(seven.current, 1);
    }

    #[test]
    fn unlock_creates_per_counter_sets() {
        let mut p = profile();
        p.achievements.social.collections_created = 5;
        p.achievements.special.early_bird_sessions = 1;
        let unlocked = unlock_reached(&mut p);
        assert_eq!(unlocked.len(), 2);
        assert!(p.achievements.social.unlocked_milestones[&SocialCounter::Collections].contains(5));
        assert!(p.achievements.special.unlocked_milestones[&SpecialCounter::EarlyBird].contains(1));
        assert!(!p.achievements.social.unlocked_milestones.contains_key(&SocialCounter::Notes));
    }

    proptest! {
        #[test]
        fn projection_matches_formula(videos in 0u64..1000, streak in 0u32..400, secs in 0u64..100_000) {
            let mut p = profile();
            p.stats.completed_video_count = videos;
            p.stats.study_streak = streak;
            p.stats.total_watch_time_seconds = secs;
            for a in achievements(&p) {
                let raw = match a.category {
                    AchievementCategory::Videos => videos,
                    AchievementCategory::Streaks => u64::from(streak),
                    AchievementCategory::Time => secs / 60,
                    _ => 0,
                };
                let goal = u64::from(a.goal);
                prop_assert_eq!(u64::from(a.current), raw.min(goal));
                prop_assert_eq!(a.progress, (raw as f64 / goal as f64).min(1.0));
                prop_assert_eq!(a.unlocked, a.progress >= 1.0);
            }
        }

        #[test]
        fn unlock_sets_never_shrink(streaks in proptest::collection::vec(0u32..120, 1..40)) {
            let mut p = profile();
            let mut seen = 0usize;
            for s in streaks {
                p.stats.study_streak = s;
                unlock_reached(&mut p);
                let now = p.achievements.streaks.unlocked_milestones.len();
                prop_assert!(now >= seen);
                seen = now;
            }
        }
    }
}
