//! Automatic scheduling of tasks into free calendar time.
//!
//! - [`slot`]: single-day earliest-fit search
//! - [`engine`]: multi-task, multi-day batch suggestions

pub mod engine;
pub mod slot;

pub use engine::{compare_tasks, order_tasks, EngineOptions, SuggestionEngine};
pub use slot::{window_bounds, SlotFinder, DEFAULT_STEP_MINUTES};
