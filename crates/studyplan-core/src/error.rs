//! Core error types for studyplan-core.
//!
//! Every fallible operation in the library reports through one of the
//! enums below; `CoreError` wraps them for callers that do not care which
//! layer failed.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Core error type for studyplan-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// External suggestion provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Single-event placement errors
    #[error("Placement error: {0}")]
    Placement(#[from] PlacementError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home directory could not be resolved
    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

/// Errors raised while talking to an external suggestion backend.
///
/// The suggestion engine never propagates these; they are logged and the
/// batch falls back to deterministic allocation.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The selected backend needs a credential that is not configured
    #[error("Provider '{provider}' is missing required setting '{setting}'")]
    MissingCredentials {
        provider: &'static str,
        setting: &'static str,
    },

    /// Network or transport failure
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Non-2xx response
    #[error("Request failed with status {status}")]
    Status { status: u16, body: String },

    /// Response body could not be understood as a chat completion
    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),

    /// Completion content did not match the suggestion envelope
    #[error("Suggestion payload does not match schema: {0}")]
    Schema(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

/// Errors from the single-event schedule and move operations.
#[derive(Error, Debug)]
pub enum PlacementError {
    /// No free slot exists in the work window on the requested day
    #[error("No free slot available on {day}")]
    Conflict { day: NaiveDate },

    /// Requested end is not after requested start
    #[error("Invalid time range: end ({end}) must be after start ({start})")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The event to move does not exist
    #[error("Event not found: {0}")]
    EventNotFound(String),

    /// The calendar store failed
    #[error("Calendar store error: {0}")]
    Store(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end_at ({end}) must be greater than start_at ({start})")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn placement_conflict_message_names_the_day() {
        let err = PlacementError::Conflict {
            day: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        };
        assert_eq!(err.to_string(), "No free slot available on 2024-01-02");
    }

    #[test]
    fn core_error_wraps_validation() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let err: CoreError = ValidationError::InvalidTimeRange { start, end: start }.into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("must be greater than"));
    }

    #[test]
    fn validation_error_only_covers_time_ranges() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let err = ValidationError::InvalidTimeRange { start, end: start };
        match err {
            ValidationError::InvalidTimeRange { start: s, end: e } => assert_eq!(s, e),
        }
    }
}
