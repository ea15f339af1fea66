use std::path::{Path, PathBuf};

use clap::Args;
use studyplan_core::{EventPlacementService, SlotFinder, TimezoneConverter};

use super::{load_calendar, load_config, parse_instant, save_calendar, CliResult};

#[derive(Args)]
pub struct MoveArgs {
    /// Calendar JSON file
    #[arg(long)]
    calendar: PathBuf,
    /// Event id to move
    #[arg(long)]
    event: String,
    /// New start (RFC 3339)
    #[arg(long)]
    start: String,
    /// New end (RFC 3339)
    #[arg(long)]
    end: String,
}

pub fn run(args: MoveArgs, config_path: Option<&Path>) -> CliResult {
    let config = load_config(config_path)?;
    let prefs = config.preferences();
    let start = parse_instant(&args.start)?;
    let end = parse_instant(&args.end)?;

    let calendar = load_calendar(&args.calendar)?;
    let service = EventPlacementService::new(
        calendar.clone(),
        TimezoneConverter::new(prefs.timezone.as_deref()),
    )
    .with_finder(SlotFinder::new(config.search.step_minutes));

    let event = service.move_event(&args.event, start, end, prefs.window)?;
    save_calendar(&args.calendar, &calendar)?;

    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}
