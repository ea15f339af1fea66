use std::path::Path;

use chrono::{NaiveDateTime, Utc};
use clap::Args;
use serde_json::json;
use studyplan_core::timezone::format_offset;
use studyplan_core::TimezoneConverter;

use super::{load_config, parse_instant, CliResult};

#[derive(Args)]
pub struct TzArgs {
    /// IANA zone name, defaults to the configured timezone
    #[arg(long)]
    zone: Option<String>,
    /// Instant to convert (RFC 3339), defaults to now
    #[arg(long, conflicts_with = "local")]
    at: Option<String>,
    /// Wall-clock time to convert to UTC (e.g. 2024-03-10T02:30:00)
    #[arg(long)]
    local: Option<String>,
}

pub fn run(args: TzArgs, config_path: Option<&Path>) -> CliResult {
    let zone = match args.zone {
        Some(zone) => Some(zone),
        None => load_config(config_path)?.preferences.timezone,
    };
    let converter = TimezoneConverter::new(zone.as_deref());

    let instant = match (args.local.as_deref(), args.at.as_deref()) {
        (Some(raw), _) => {
            let local = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M"))
                .map_err(|e| format!("invalid local time '{raw}': {e}"))?;
            converter.to_utc(local)
        }
        (None, Some(raw)) => parse_instant(raw)?,
        (None, None) => Utc::now(),
    };

    let local = converter.to_zoned(instant);
    let output = json!({
        "zone": converter.name().unwrap_or("UTC"),
        "resolved": !converter.is_passthrough() || converter.name().is_none(),
        "utc": instant.to_rfc3339(),
        "local": local.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "offset": format_offset(converter.offset_seconds_at(instant)),
        "ambiguous": converter.is_ambiguous(local),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
