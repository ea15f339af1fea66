use std::path::Path;

use clap::Subcommand;
use studyplan_core::Config;

use super::{load_config, save_config, CliResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "preferences.timezone", "provider.kind")
        key: String,
    },
    /// Set a config value
    Set {
        /// Dot-separated key
        key: String,
        /// New value (empty string clears optional values)
        value: String,
    },
    /// Show the whole config with secrets masked
    Show,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction, config_path: Option<&Path>) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let config = load_config(config_path)?;
            match config.get(&key) {
                Some(value) if key.starts_with("provider.api_key") && value != "none" => {
                    println!("********")
                }
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = load_config(config_path)?;
            config.set(&key, &value)?;
            save_config(&config, config_path)?;
            println!("ok");
        }
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
        ConfigAction::Reset => {
            save_config(&Config::default(), config_path)?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
