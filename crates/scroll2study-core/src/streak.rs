//! Consecutive-day study streaks.
//!
//! Days are calendar days in the user's local timezone at the time of the
//! session. The offset is not stored alongside the date, so a user who
//! travels across timezones can gain or lose a day at the boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a study event changed the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTransition {
    /// First recorded study session.
    Started,
    /// Another session on the same calendar day.
    SameDay,
    /// Session on the day after the last one.
    Extended,
    /// Gap of two or more days, or a date before the last one.
    Reset,
}

/// Streak counters as stored on the profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current: u32,
    pub longest: u32,
    pub last_study_date: Option<NaiveDate>,
}

impl StreakState {
    pub fn new(current: u32, longest: u32, last_study_date: Option<NaiveDate>) -> Self {
        Self {
            current,
            longest,
            last_study_date,
        }
    }

    /// Record a study event on `date` and return the transition taken.
    pub fn record(&mut self, date: NaiveDate) -> StreakTransition {
        let transition = match self.last_study_date {
            None => StreakTransition::Started,
            Some(last) => match (date - last).num_days() {
                0 => StreakTransition::SameDay,
                1 => StreakTransition::Extended,
                _ => StreakTransition::Reset,
            },
        };

        match transition {
            StreakTransition::Started | StreakTransition::Reset => self.current = 1,
            StreakTransition::Extended => self.current = self.current.saturating_add(1),
            StreakTransition::SameDay => {}
        }

        self.last_study_date = Some(date);
        self.longest = self.longest.max(self.current);

        debug!(
            ?transition,
            current = self.current,
            longest = self.longest,
            %date,
            "streak updated"
        );
        transition
    }
}
