use clap::{Subcommand, ValueEnum};
use serde_json::json;

use scroll2study_core::achievements::SocialCounter;
use scroll2study_core::AchievementCategory;

use super::{open_service, print_json, CliResult};

#[derive(Clone, Copy, ValueEnum)]
pub enum CategoryArg {
    Videos,
    Subjects,
    Streaks,
    Time,
    Social,
    Special,
}

impl From<CategoryArg> for AchievementCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Videos => AchievementCategory::Videos,
            CategoryArg::Subjects => AchievementCategory::Subjects,
            CategoryArg::Streaks => AchievementCategory::Streaks,
            CategoryArg::Time => AchievementCategory::Time,
            CategoryArg::Social => AchievementCategory::Social,
            CategoryArg::Special => AchievementCategory::Special,
        }
    }
}

#[derive(Subcommand)]
pub enum AchievementsAction {
    /// Show milestone progress
    List {
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,
        /// Only milestones whose goal is met
        #[arg(long)]
        unlocked: bool,
    },
    /// Persist newly reached milestones and print them
    Check,
    /// Count a social event: collections, notes, shares, groups, helped
    Record {
        counter: String,
    },
}

pub fn run(action: AchievementsAction, credential: Option<String>) -> CliResult {
    let mut service = open_service(credential)?;
    match action {
        AchievementsAction::List { category, unlocked } => {
            let mut list = service.achievements(category.map(Into::into))?;
            if unlocked {
                list.retain(|a| a.unlocked || a.recorded);
            }
            print_json(&list)
        }
        AchievementsAction::Check => print_json(&service.check_and_unlock_achievements()?),
        AchievementsAction::Record { counter } => {
            let counter = SocialCounter::parse(&counter)
                .ok_or_else(|| format!("unknown social counter '{counter}'"))?;
            let count = service.record_social(counter)?;
            print_json(&json!({ "counter": counter.as_str(), "count": count }))
        }
    }
}
