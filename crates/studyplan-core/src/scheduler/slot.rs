//! Single-day slot search.
//!
//! Finds the earliest interval of a given length that fits inside the work
//! window of one local day without touching any busy interval. Everything
//! here is local wall-clock time; callers convert at the edges.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::schedule::{LocalInterval, WorkWindow};

/// Default candidate spacing in minutes.
pub const DEFAULT_STEP_MINUTES: i64 = 15;

/// Local start and end of the work window on `date`.
///
/// An `end_hour` of 24 lands on midnight of the following day.
pub fn window_bounds(date: NaiveDate, window: WorkWindow) -> (NaiveDateTime, NaiveDateTime) {
    let midnight = date.and_time(NaiveTime::MIN);
    (
        midnight + Duration::hours(i64::from(window.start_hour)),
        midnight + Duration::hours(i64::from(window.end_hour)),
    )
}

/// Truncate to whole minutes.
pub fn snap_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// Pure interval search over one local calendar day.
#[derive(Debug, Clone, Copy)]
pub struct SlotFinder {
    step_minutes: i64,
}

impl SlotFinder {
    /// Create a finder stepping by `step_minutes`; values below one are
    /// treated as one minute.
    pub fn new(step_minutes: i64) -> Self {
        Self {
            step_minutes: step_minutes.max(1),
        }
    }

    pub fn step_minutes(&self) -> i64 {
        self.step_minutes
    }

    /// Find the earliest free slot on the local day of `desired_start`.
    ///
    /// # Arguments
    /// * `desired_start` - Earliest acceptable start (local wall-clock)
    /// * `duration_minutes` - Slot length
    /// * `window` - Daily work window
    /// * `busy` - Intervals the slot must not overlap
    ///
    /// # Returns
    /// The first candidate at `step` increments from the later of the snapped
    /// desired start and the window start, or `None` if nothing fits before
    /// the window closes.
    pub fn find_slot(
        &self,
        desired_start: NaiveDateTime,
        duration_minutes: i64,
        window: WorkWindow,
        busy: &[LocalInterval],
    ) -> Option<LocalInterval> {
        self.find_slot_where(desired_start, duration_minutes, window, busy, |_| true)
    }

    /// Like [`SlotFinder::find_slot`], but a candidate that is free in local
    /// time must also pass `accept` before it is returned.
    ///
    /// Rejected candidates do not stop the scan.
    pub fn find_slot_where<F>(
        &self,
        desired_start: NaiveDateTime,
        duration_minutes: i64,
        window: WorkWindow,
        busy: &[LocalInterval],
        mut accept: F,
    ) -> Option<LocalInterval>
    where
        F: FnMut(&LocalInterval) -> bool,
    {
        if duration_minutes <= 0 || duration_minutes > window.length_minutes() {
            return None;
        }

        let snapped = snap_to_minute(desired_start);
        let (window_start, window_end) = window_bounds(snapped.date(), window);
        let duration = Duration::minutes(duration_minutes);
        let last_start = window_end - duration;
        let step = Duration::minutes(self.step_minutes);

        let mut cursor = snapped.max(window_start);
        while cursor <= last_start {
            let candidate = LocalInterval::new(cursor, cursor + duration);
            if !busy.iter().any(|b| candidate.overlaps(b)) && accept(&candidate) {
                return Some(candidate);
            }
            cursor += step;
        }

        None
    }
}

impl Default for SlotFinder {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_MINUTES)
    }
}
