use clap::Subcommand;
use serde_json::json;

use scroll2study_core::ai::AiClient;
use scroll2study_core::Config;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum NoteAction {
    /// Summarize a note with the AI service
    Summarize {
        /// Note text; reads stdin when omitted
        text: Option<String>,
    },
}

pub fn run(action: NoteAction) -> CliResult {
    match action {
        NoteAction::Summarize { text } => {
            let text = match text {
                Some(text) => text,
                None => std::io::read_to_string(std::io::stdin())?,
            };
            if text.trim().is_empty() {
                return Err("nothing to summarize".into());
            }

            let config = Config::load()?;
            let ai = AiClient::from_stored_key(&config.ai)?;
            let runtime = tokio::runtime::Runtime::new()?;
            let summary = runtime.block_on(ai.summarize_note(&text))?;
            print_json(&json!({ "summary": summary }))
        }
    }
}
