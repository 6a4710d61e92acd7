use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "scroll2study", version, about = "scroll2study CLI")]
struct Cli {
    /// Session credential (defaults to the one saved by `auth`)
    #[arg(long, global = true, env = "SCROLL2STUDY_CREDENTIAL", hide_env_values = true)]
    credential: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign up, sign in and sign out
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Show and edit the user profile
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Video catalog and grid
    Catalog {
        #[command(subcommand)]
        action: commands::catalog::CatalogAction,
    },
    /// Watch progress
    Progress {
        #[command(subcommand)]
        action: commands::progress::ProgressAction,
    },
    /// Study session tracking
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Achievement milestones
    Achievements {
        #[command(subcommand)]
        action: commands::achievements::AchievementsAction,
    },
    /// Saved video collections
    Collection {
        #[command(subcommand)]
        action: commands::collection::CollectionAction,
    },
    /// AI note summaries
    Note {
        #[command(subcommand)]
        action: commands::note::NoteAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("SCROLL2STUDY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let credential = cli.credential;
    let result = match cli.command {
        Commands::Auth { action } => commands::auth::run(action, credential),
        Commands::Profile { action } => commands::profile::run(action, credential),
        Commands::Catalog { action } => commands::catalog::run(action, credential),
        Commands::Progress { action } => commands::progress::run(action, credential),
        Commands::Session { action } => commands::session::run(action, credential),
        Commands::Achievements { action } => commands::achievements::run(action, credential),
        Commands::Collection { action } => commands::collection::run(action, credential),
        Commands::Note { action } => commands::note::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
