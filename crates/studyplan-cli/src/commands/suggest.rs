use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Args;
use serde::Deserialize;
use studyplan_core::{Interval, SuggestionEngine, Task};

use super::{load_config, parse_instant, CliResult};

#[derive(Args)]
pub struct SuggestArgs {
    /// JSON file with `tasks` and `committed` arrays
    #[arg(long)]
    input: PathBuf,
    /// Current time (RFC 3339), defaults to the system clock
    #[arg(long)]
    now: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SuggestInput {
    tasks: Vec<Task>,
    #[serde(default)]
    committed: Vec<Interval>,
}

pub fn run(args: SuggestArgs, config_path: Option<&Path>) -> CliResult {
    let config = load_config(config_path)?;
    let input: SuggestInput = serde_json::from_str(&std::fs::read_to_string(&args.input)?)?;
    let now = match args.now.as_deref() {
        Some(raw) => parse_instant(raw)?,
        None => Utc::now(),
    };

    let engine = SuggestionEngine::default().with_options(config.engine_options());
    let runtime = tokio::runtime::Runtime::new()?;
    let suggestions = runtime.block_on(engine.suggest(
        &input.tasks,
        &config.preferences(),
        &input.committed,
        now,
    ));

    println!("{}", serde_json::to_string_pretty(&suggestions)?);
    Ok(())
}
