//! # Studyplan Core Library
//!
//! This library provides the scheduling logic for the studyplan planner.
//! Every operation is available through the standalone CLI binary, which is
//! a thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Timezone**: conversion between UTC instants and a user's wall clock
//! - **Scheduler**: single-day slot search and the batch suggestion engine
//! - **Provider**: optional chat-completion backends that propose start times
//! - **Placement**: committing and moving events against a calendar store
//! - **Config**: TOML-based preferences
//!
//! ## Key Components
//!
//! - [`TimezoneConverter`]: zone-aware conversions
//! - [`SlotFinder`]: earliest free slot on one day
//! - [`SuggestionEngine`]: schedule a batch of tasks
//! - [`EventPlacementService`]: conflict-aware event placement
//! - [`Config`]: application configuration management

pub mod config;
pub mod error;
pub mod placement;
pub mod provider;
pub mod schedule;
pub mod scheduler;
pub mod timezone;

pub use config::Config;
pub use error::{ConfigError, CoreError, PlacementError, ProviderError, ValidationError};
pub use placement::{CalendarStore, EventPlacementService, InMemoryCalendar};
pub use provider::{HttpClient, HttpResponse, ReqwestHttpClient, SuggestionProvider};
pub use schedule::{
    CommittedEvent, Interval, LocalInterval, Priority, ProviderKind, ProviderSettings,
    ScheduleSuggestion, SuggestionOrigin, Task, UserSchedulingPreferences, WorkWindow,
};
pub use scheduler::{EngineOptions, SlotFinder, SuggestionEngine};
pub use timezone::TimezoneConverter;
