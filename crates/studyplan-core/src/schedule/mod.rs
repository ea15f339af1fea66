//! Schedule types for tasks, intervals, suggestions and user preferences.
//!
//! These are the typed inputs supplied by the persistence and settings
//! layers and the typed outputs handed back to them. Nothing in this module
//! talks to a store.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Task priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Numeric rank, higher means more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

/// A pending task waiting to be placed on the calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub effort_minutes: Option<u32>,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Task {
    /// Create a task with medium priority and no due date or effort.
    pub fn new(id: impl Into<String>, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            due_at: None,
            effort_minutes: None,
            priority: Priority::Medium,
            created_at,
            notes: None,
        }
    }

    pub fn with_due(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn with_effort(mut self, minutes: u32) -> Self {
        self.effort_minutes = Some(minutes);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A half-open span of absolute time, `[start_at, end_at)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl Interval {
    /// Create an interval, rejecting empty or inverted ranges.
    pub fn new(start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end_at <= start_at {
            return Err(ValidationError::InvalidTimeRange {
                start: start_at,
                end: end_at,
            });
        }
        Ok(Self { start_at, end_at })
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_at - self.start_at).num_minutes()
    }

    /// Check if this interval overlaps with another.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start_at < other.end_at && other.start_at < self.end_at
    }
}

/// An interval expressed as zone wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl LocalInterval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &LocalInterval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Provenance of a suggestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionOrigin {
    /// Placement anchored on a validated external suggestion
    Model,
    /// Placement computed by deterministic allocation alone
    Fallback,
}

/// A proposed placement for one task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSuggestion {
    pub task_id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub origin: SuggestionOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ScheduleSuggestion {
    pub fn interval(&self) -> Interval {
        Interval {
            start_at: self.start_at,
            end_at: self.end_at,
        }
    }
}

/// Daily local-time span during which new commitments are accepted.
///
/// `end_hour` may be 24, meaning midnight at the end of the day. Callers
/// guarantee `end_hour > start_hour`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl WorkWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    pub fn length_minutes(&self) -> i64 {
        (i64::from(self.end_hour) - i64::from(self.start_hour)) * 60
    }
}

impl Default for WorkWindow {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 18,
        }
    }
}

/// Which chat-completion backend supplies external suggestions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// No external suggestions
    #[default]
    None,
    /// Hosted OpenAI chat completions
    OpenAi,
    /// Self-hosted OpenAI-compatible endpoint
    Local,
}

/// Backend selection and credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProviderSettings {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Per-user scheduling preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSchedulingPreferences {
    /// IANA zone name; `None` means raw UTC.
    #[serde(default)]
    pub timezone: Option<String>,
    pub window: WorkWindow,
    pub default_duration_minutes: u32,
    #[serde(default)]
    pub provider: ProviderSettings,
}

impl Default for UserSchedulingPreferences {
    fn default() -> Self {
        Self {
            timezone: None,
            window: WorkWindow::default(),
            default_duration_minutes: 60,
            provider: ProviderSettings::default(),
        }
    }
}

/// An event already committed to the calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommittedEvent {
    pub id: String,
    pub title: String,
    pub interval: Interval,
    #[serde(default)]
    pub task_id: Option<String>,
}

impl CommittedEvent {
    /// Create an event with a fresh id.
    pub fn new(title: impl Into<String>, interval: Interval, task_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            interval,
            task_id,
        }
    }
}
