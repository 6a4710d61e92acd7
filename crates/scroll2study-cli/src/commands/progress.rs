use clap::Subcommand;
use serde_json::json;

use super::{open_service, print_json, CliResult};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Mark a video as watched to completion
    Watch {
        video_id: String,
    },
    /// Completion ratio for one subject
    Subject {
        subject_id: String,
    },
    /// Current displayed level
    Level,
    /// Every watched cell
    Show,
}

pub fn run(action: ProgressAction, credential: Option<String>) -> CliResult {
    let mut service = open_service(credential)?;
    match action {
        ProgressAction::Watch { video_id } => print_json(&service.mark_watched(&video_id)?),
        ProgressAction::Subject { subject_id } => {
            let progress = service.subject_progress(&subject_id)?;
            print_json(&json!({ "subject": subject_id, "progress": progress }))
        }
        ProgressAction::Level => print_json(&json!({ "level": service.current_level()? })),
        ProgressAction::Show => {
            let index = service.catalog();
            let progress = service.progress()?;
            let subjects: Vec<_> = index
                .subjects()
                .iter()
                .map(|s| {
                    let watched: Vec<u32> = index
                        .levels_for(&s.id)
                        .into_iter()
                        .filter(|&level| progress.is_watched(&s.id, level))
                        .collect();
                    json!({
                        "subject": s.id,
                        "watchedLevels": watched,
                        "progress": progress.subject_progress(&s.id, &index),
                    })
                })
                .collect();
            print_json(&json!({
                "totalCompleted": progress.total_completed(),
                "currentLevel": progress.current_level(&index),
                "subjects": subjects,
            }))
        }
    }
}
