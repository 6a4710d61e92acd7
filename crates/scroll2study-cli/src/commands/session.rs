use clap::Subcommand;
use chrono::{DateTime, Utc};
use serde_json::json;

use scroll2study_core::{Config, StudySession};

use super::{open_service, print_json, CliResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Record a finished study session
    Track {
        /// Session length in seconds
        #[arg(long)]
        duration: u64,
        /// Subject studied (repeatable)
        #[arg(long = "subject")]
        subjects: Vec<String>,
        /// Start time as RFC 3339 (e.g. 2024-03-05T07:00:00+09:00).
        /// Defaults to now in the configured local offset.
        #[arg(long)]
        start: Option<String>,
    },
}

pub fn run(action: SessionAction, credential: Option<String>) -> CliResult {
    match action {
        SessionAction::Track {
            duration,
            subjects,
            start,
        } => {
            let started_at = match start {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| format!("invalid --start '{raw}': {e}"))?,
                None => {
                    let offset = Config::load()?.local_offset();
                    Utc::now().with_timezone(&offset)
                }
            };

            let mut service = open_service(credential)?;
            let session = StudySession::new(started_at, duration, subjects);
            let outcome = service.track_study_session(&session)?;
            print_json(&json!({ "outcome": outcome }))
        }
    }
}
