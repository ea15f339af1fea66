use std::path::{Path, PathBuf};

use clap::Args;
use studyplan_core::{EventPlacementService, SlotFinder, TimezoneConverter};

use super::{load_calendar, load_config, parse_instant, save_calendar, CliResult};

#[derive(Args)]
pub struct ScheduleArgs {
    /// Calendar JSON file (created if missing)
    #[arg(long)]
    calendar: PathBuf,
    /// Task id to place
    #[arg(long)]
    task: String,
    /// Earliest acceptable start (RFC 3339)
    #[arg(long)]
    start: String,
    /// Duration in minutes, defaults to the configured default duration
    #[arg(long)]
    minutes: Option<i64>,
}

pub fn run(args: ScheduleArgs, config_path: Option<&Path>) -> CliResult {
    let config = load_config(config_path)?;
    let prefs = config.preferences();
    let start = parse_instant(&args.start)?;
    let minutes = args
        .minutes
        .unwrap_or_else(|| i64::from(prefs.default_duration_minutes));

    let calendar = load_calendar(&args.calendar)?;
    let service = EventPlacementService::new(
        calendar.clone(),
        TimezoneConverter::new(prefs.timezone.as_deref()),
    )
    .with_finder(SlotFinder::new(config.search.step_minutes));

    let event = service.schedule(&args.task, start, minutes, prefs.window)?;
    save_calendar(&args.calendar, &calendar)?;

    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}
