//! Profile commands: show the stored document and edit its metadata.

use clap::Subcommand;

use super::{open_service, print_json, CliResult};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Print the full profile document
    Show,

    /// Edit display name, bio or avatar
    Edit {
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },

    /// Edit study preferences
    Prefs {
        /// Selected subject ids (repeatable)
        #[arg(long = "subject")]
        subjects: Vec<String>,
        #[arg(long)]
        daily_goal_minutes: Option<u32>,
        /// e.g. "beginner", "intermediate", "advanced"
        #[arg(long)]
        difficulty: Option<String>,
    },

    /// Edit app settings
    Settings {
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        autoplay: Option<bool>,
        #[arg(long)]
        dark_mode: Option<bool>,
    },
}

pub fn run(action: ProfileAction, credential: Option<String>) -> CliResult {
    let mut service = open_service(credential)?;
    let current = service.ensure_profile()?;

    match action {
        ProfileAction::Show => {}
        ProfileAction::Edit {
            display_name,
            bio,
            avatar_url,
        } => {
            let mut info = current.profile;
            if let Some(name) = display_name {
                info.display_name = name;
            }
            if let Some(bio) = bio {
                info.bio = bio;
            }
            if let Some(url) = avatar_url {
                info.avatar_url = Some(url).filter(|u| !u.is_empty());
            }
            service.update_profile_info(info)?;
        }
        ProfileAction::Prefs {
            subjects,
            daily_goal_minutes,
            difficulty,
        } => {
            let mut prefs = current.preferences;
            if !subjects.is_empty() {
                prefs.selected_subjects = subjects;
            }
            if let Some(minutes) = daily_goal_minutes {
                prefs.daily_goal_minutes = minutes;
            }
            if let Some(difficulty) = difficulty {
                prefs.difficulty = difficulty;
            }
            service.update_preferences(prefs)?;
        }
        ProfileAction::Settings {
            notifications,
            autoplay,
            dark_mode,
        } => {
            let mut settings = current.settings;
            if let Some(v) = notifications {
                settings.notifications_enabled = v;
            }
            if let Some(v) = autoplay {
                settings.autoplay = v;
            }
            if let Some(v) = dark_mode {
                settings.dark_mode = v;
            }
            service.update_settings(settings)?;
        }
    }

    print_json(&service.ensure_profile()?)
}
