pub mod config;
pub mod moves;
pub mod schedule;
pub mod suggest;
pub mod tz;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use studyplan_core::{CommittedEvent, Config, ConfigError, InMemoryCalendar};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Load the config from `path`, or from the default location.
///
/// A missing explicit file yields defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(p) if p.exists() => Config::load_from(p),
        Some(_) => Ok(Config::default()),
        None => Config::load(),
    }
}

pub fn save_config(config: &Config, path: Option<&Path>) -> Result<(), ConfigError> {
    match path {
        Some(p) => config.save_to(p),
        None => config.save(),
    }
}

pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim())
        .map_err(|e| format!("invalid RFC 3339 timestamp '{raw}': {e}"))?;
    Ok(parsed.with_timezone(&Utc))
}

/// Read a calendar file (JSON array of events); a missing file is empty.
pub fn load_calendar(path: &Path) -> Result<Arc<InMemoryCalendar>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Ok(Arc::new(InMemoryCalendar::new()));
    }
    let content = std::fs::read_to_string(path)?;
    let events: Vec<CommittedEvent> = serde_json::from_str(&content)?;
    tracing::debug!(path = %path.display(), events = events.len(), "loaded calendar");
    Ok(Arc::new(InMemoryCalendar::from_events(events)))
}

pub fn save_calendar(path: &Path, calendar: &InMemoryCalendar) -> CliResult {
    let events = calendar.events()?;
    std::fs::write(path, serde_json::to_string_pretty(&events)?)?;
    Ok(())
}
