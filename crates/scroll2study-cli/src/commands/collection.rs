use clap::Subcommand;

use scroll2study_core::ai::AiClient;
use scroll2study_core::Config;

use super::{open_service, print_json, CliResult};

#[derive(Subcommand)]
pub enum CollectionAction {
    /// Save a collection of catalog videos
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Video id (repeatable)
        #[arg(long = "video", required = true)]
        videos: Vec<String>,
    },
    /// List saved collections
    List,
    /// Ask the AI service to build a collection on a topic
    Suggest {
        topic: String,
    },
}

pub fn run(action: CollectionAction, credential: Option<String>) -> CliResult {
    let mut service = open_service(credential)?;
    match action {
        CollectionAction::Create {
            name,
            description,
            videos,
        } => print_json(&service.create_collection(&name, &description, videos)?),
        CollectionAction::List => print_json(&service.collections()?),
        CollectionAction::Suggest { topic } => {
            let config = Config::load()?;
            let ai = AiClient::from_stored_key(&config.ai)?;
            let runtime = tokio::runtime::Runtime::new()?;
            let collection = runtime.block_on(service.suggest_collection(&ai, &topic))?;
            print_json(&collection)
        }
    }
}
