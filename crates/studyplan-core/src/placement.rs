//! Single-event placement for direct user actions.
//!
//! Unlike the batch engine, a schedule or move request searches only the
//! requested local day and reports a conflict when nothing fits. There is
//! no multi-day search and no guaranteed placement.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::PlacementError;
use crate::scheduler::SlotFinder;
use crate::schedule::{CommittedEvent, Interval, LocalInterval, WorkWindow};
use crate::timezone::TimezoneConverter;

/// Committed-event storage owned by the persistence layer.
pub trait CalendarStore: Send + Sync {
    /// Events overlapping `[start, end)`.
    fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CommittedEvent>, PlacementError>;

    fn get(&self, id: &str) -> Result<Option<CommittedEvent>, PlacementError>;

    /// Insert or replace by id.
    fn save(&self, event: CommittedEvent) -> Result<(), PlacementError>;
}

/// In-memory calendar, used by tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    events: Mutex<Vec<CommittedEvent>>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<CommittedEvent>) -> Self {
        Self {
            events: Mutex::new(events),
        }
    }

    /// Snapshot of every stored event, ordered by start.
    pub fn events(&self) -> Result<Vec<CommittedEvent>, PlacementError> {
        let mut events = self.lock()?.clone();
        events.sort_by_key(|e| e.interval.start_at);
        Ok(events)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<CommittedEvent>>, PlacementError> {
        self.events
            .lock()
            .map_err(|_| PlacementError::Store("calendar lock poisoned".to_string()))
    }
}

impl CalendarStore for InMemoryCalendar {
    fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CommittedEvent>, PlacementError> {
        let range = Interval {
            start_at: start,
            end_at: end,
        };
        Ok(self
            .lock()?
            .iter()
            .filter(|e| e.interval.overlaps(&range))
            .cloned()
            .collect())
    }

    fn get(&self, id: &str) -> Result<Option<CommittedEvent>, PlacementError> {
        Ok(self.lock()?.iter().find(|e| e.id == id).cloned())
    }

    fn save(&self, event: CommittedEvent) -> Result<(), PlacementError> {
        let mut events = self.lock()?;
        match events.iter_mut().find(|e| e.id == event.id) {
            Some(existing) => *existing = event,
            None => events.push(event),
        }
        Ok(())
    }
}

/// Schedule and move operations for one user.
pub struct EventPlacementService {
    store: Arc<dyn CalendarStore>,
    converter: TimezoneConverter,
    finder: SlotFinder,
}

impl EventPlacementService {
    pub fn new(store: Arc<dyn CalendarStore>, converter: TimezoneConverter) -> Self {
        Self {
            store,
            converter,
            finder: SlotFinder::default(),
        }
    }

    pub fn with_finder(mut self, finder: SlotFinder) -> Self {
        self.finder = finder;
        self
    }

    /// UTC bounds of a local calendar day.
    fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.converter.to_utc(date.and_time(NaiveTime::MIN));
        let end = date
            .succ_opt()
            .map(|next| self.converter.to_utc(next.and_time(NaiveTime::MIN)))
            .unwrap_or(start + Duration::days(1));
        (start, end)
    }

    /// Committed events on the local day of `at`, widened to cover `until`.
    fn same_day_events(
        &self,
        at: DateTime<Utc>,
        until: DateTime<Utc>,
        exclude: Option<&str>,
    ) -> Result<Vec<CommittedEvent>, PlacementError> {
        let (day_start, day_end) = self.day_bounds(self.converter.local_date(at));
        let events = self.store.events_between(day_start, day_end.max(until))?;
        Ok(events
            .into_iter()
            .filter(|e| exclude != Some(e.id.as_str()))
            .collect())
    }

    fn to_local(&self, events: &[CommittedEvent]) -> Vec<LocalInterval> {
        events
            .iter()
            .map(|e| self.converter.interval_to_zoned(&e.interval))
            .collect()
    }

    /// Earliest span of exactly `length` on the local day of `desired_start`
    /// that overlaps none of `others`.
    ///
    /// The search runs over whole minutes, rounded up, so a sub-minute span
    /// still gets a candidate. Each candidate is checked again as instants,
    /// which catches repeated and skipped wall-clock hours.
    fn find_free(
        &self,
        desired_start: DateTime<Utc>,
        length: Duration,
        window: WorkWindow,
        others: &[CommittedEvent],
    ) -> Result<Interval, PlacementError> {
        let busy = self.to_local(others);
        let desired_local = self.converter.to_zoned(desired_start);
        let search_minutes = (length.num_seconds() + 59) / 60;

        let place = |local: &LocalInterval| {
            let start_at = self.converter.to_utc(local.start);
            Interval {
                start_at,
                end_at: start_at + length,
            }
        };
        let slot = self
            .finder
            .find_slot_where(desired_local, search_minutes, window, &busy, |local| {
                let span = self.converter.interval_to_utc(local);
                span.end_at - span.start_at == Duration::minutes(search_minutes)
                    && !others.iter().any(|e| e.interval.overlaps(&place(local)))
            })
            .ok_or(PlacementError::Conflict {
                day: desired_local.date(),
            })?;

        Ok(place(&slot))
    }

    /// Place a task at the earliest free time on the local day of
    /// `desired_start`.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::Conflict`] if no slot fits that day and
    /// [`PlacementError::InvalidTimeRange`] for a non-positive duration.
    pub fn schedule(
        &self,
        task_id: &str,
        desired_start: DateTime<Utc>,
        duration_minutes: i64,
        window: WorkWindow,
    ) -> Result<CommittedEvent, PlacementError> {
        if duration_minutes <= 0 {
            return Err(PlacementError::InvalidTimeRange {
                start: desired_start,
                end: desired_start,
            });
        }

        let existing = self.same_day_events(desired_start, desired_start, None)?;
        let interval = self.find_free(
            desired_start,
            Duration::minutes(duration_minutes),
            window,
            &existing,
        )?;
        let event = CommittedEvent::new(task_id, interval, Some(task_id.to_string()));
        self.store.save(event.clone())?;
        tracing::info!(
            task_id,
            event_id = %event.id,
            start = %interval.start_at,
            "scheduled task"
        );
        Ok(event)
    }

    /// Move an existing event.
    ///
    /// A requested span that overlaps nothing is committed exactly as given.
    /// An overlapping span is moved to the nearest later free slot of the
    /// same length on that local day.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::InvalidTimeRange`] if `new_end <= new_start`
    /// (checked first), [`PlacementError::EventNotFound`] for an unknown id,
    /// and [`PlacementError::Conflict`] when no later slot fits.
    pub fn move_event(
        &self,
        event_id: &str,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
        window: WorkWindow,
    ) -> Result<CommittedEvent, PlacementError> {
        if new_end <= new_start {
            return Err(PlacementError::InvalidTimeRange {
                start: new_start,
                end: new_end,
            });
        }

        let mut event = self
            .store
            .get(event_id)?
            .ok_or_else(|| PlacementError::EventNotFound(event_id.to_string()))?;

        let requested = Interval {
            start_at: new_start,
            end_at: new_end,
        };
        let others = self.same_day_events(new_start, new_end, Some(event_id))?;

        let interval = if others.iter().any(|e| e.interval.overlaps(&requested)) {
            tracing::debug!(event_id, "requested time overlaps, reslotting");
            self.find_free(new_start, new_end - new_start, window, &others)?
        } else {
            requested
        };

        event.interval = interval;
        self.store.save(event.clone())?;
        tracing::info!(event_id, start = %interval.start_at, "moved event");
        Ok(event)
    }
}
