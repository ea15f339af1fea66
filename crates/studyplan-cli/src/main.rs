use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "studyplan-cli", version, about = "Studyplan scheduling CLI")]
struct Cli {
    /// Config file to use instead of ~/.config/studyplan/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Suggest start times for a batch of tasks
    Suggest(commands::suggest::SuggestArgs),
    /// Place a task at the earliest free time on a day
    Schedule(commands::schedule::ScheduleArgs),
    /// Move a committed event
    Move(commands::moves::MoveArgs),
    /// Show wall-clock time and offset for a zone
    Tz(commands::tz::TzArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Suggest(args) => commands::suggest::run(args, config_path),
        Commands::Schedule(args) => commands::schedule::run(args, config_path),
        Commands::Move(args) => commands::moves::run(args, config_path),
        Commands::Tz(args) => commands::tz::run(args, config_path),
        Commands::Config { action } => commands::config::run(action, config_path),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
