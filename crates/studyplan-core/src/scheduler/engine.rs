//! Batch suggestion engine.
//!
//! Places every pending task on the calendar in one pass:
//! - Optionally asks an external backend for a starting point per task
//! - Orders tasks by due date, then priority, then creation time
//! - Searches up to `max_search_days` local days per task with [`SlotFinder`]
//! - Falls back to "after everything seen so far" when the search runs out
//!
//! Each allocated slot is added to the working busy list so later tasks in
//! the same batch avoid it. The engine never fails: external problems only
//! change the `origin` tag.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use super::slot::{snap_to_minute, window_bounds, SlotFinder, DEFAULT_STEP_MINUTES};
use crate::provider::{self, ExternalSuggestion, HttpClient, ReqwestHttpClient};
use crate::schedule::{
    Interval, LocalInterval, ScheduleSuggestion, SuggestionOrigin, Task, UserSchedulingPreferences,
    WorkWindow,
};
use crate::timezone::TimezoneConverter;

/// Tuning knobs for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Candidate spacing for slot search (minutes)
    pub step_minutes: i64,
    /// Consecutive local days searched before the fallback placement
    pub max_search_days: u32,
    /// Floor applied to every task duration (minutes)
    pub min_duration_minutes: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            step_minutes: DEFAULT_STEP_MINUTES,
            max_search_days: 30,
            min_duration_minutes: 15,
        }
    }
}

/// Deterministic task ordering: due date ascending with undated tasks last,
/// then priority descending, then creation time ascending.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    let by_due = match (a.due_at, b.due_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_due
        .then_with(|| b.priority.rank().cmp(&a.priority.rank()))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// Tasks in allocation order.
pub fn order_tasks(tasks: &[Task]) -> Vec<&Task> {
    let mut ordered: Vec<&Task> = tasks.iter().collect();
    ordered.sort_by(|a, b| compare_tasks(a, b));
    ordered
}

/// Round up to the next whole minute.
fn ceil_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    let snapped = snap_to_minute(at);
    if snapped < at {
        snapped + Duration::minutes(1)
    } else {
        snapped
    }
}

/// Start of the window on the day after `at`.
fn next_window_start(at: NaiveDateTime, window: WorkWindow) -> Option<NaiveDateTime> {
    at.date()
        .succ_opt()
        .map(|next| window_bounds(next, window).0)
}

/// Batch suggestion engine.
pub struct SuggestionEngine {
    http: Arc<dyn HttpClient>,
    options: EngineOptions,
}

impl SuggestionEngine {
    /// Create an engine with the given transport and default options.
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Produce one suggestion per task.
    ///
    /// # Arguments
    /// * `tasks` - Pending tasks to place
    /// * `preferences` - Timezone, work window, default duration, backend
    /// * `committed` - Calendar time already taken
    /// * `now` - Current instant; nothing is placed before it
    ///
    /// # Returns
    /// Suggestions sorted by start time, pairwise non-overlapping.
    pub async fn suggest(
        &self,
        tasks: &[Task],
        preferences: &UserSchedulingPreferences,
        committed: &[Interval],
        now: DateTime<Utc>,
    ) -> Vec<ScheduleSuggestion> {
        if tasks.is_empty() {
            return Vec::new();
        }

        let external = self.fetch_external(tasks, preferences, now).await;
        let mut suggestions = self.allocate(tasks, preferences, committed, now, &external);
        suggestions.sort_by_key(|s| s.start_at);

        let from_model = suggestions
            .iter()
            .filter(|s| s.origin == SuggestionOrigin::Model)
            .count();
        tracing::info!(
            tasks = tasks.len(),
            from_model,
            fallback = suggestions.len() - from_model,
            "generated schedule suggestions"
        );
        suggestions
    }

    /// Ask the configured backend for suggestions, keyed by task id.
    ///
    /// Every failure is logged and treated as "no suggestions".
    async fn fetch_external(
        &self,
        tasks: &[Task],
        preferences: &UserSchedulingPreferences,
        now: DateTime<Utc>,
    ) -> HashMap<String, ExternalSuggestion> {
        let backend = match provider::from_settings(&preferences.provider) {
            Ok(Some(backend)) => backend,
            Ok(None) => return HashMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "external suggestions unavailable");
                return HashMap::new();
            }
        };

        let fetched = provider::request_suggestions(
            self.http.as_ref(),
            backend.as_ref(),
            tasks,
            preferences,
            now,
        )
        .await;

        match fetched {
            Ok(list) => {
                let mut by_task = HashMap::new();
                for suggestion in list {
                    // first valid entry per task wins
                    by_task
                        .entry(suggestion.task_id.clone())
                        .or_insert(suggestion);
                }
                tracing::debug!(
                    provider = backend.name(),
                    accepted = by_task.len(),
                    "received external suggestions"
                );
                by_task
            }
            Err(e) => {
                tracing::warn!(provider = backend.name(), error = %e, "discarding external suggestions");
                HashMap::new()
            }
        }
    }

    /// Deterministic allocation over the ordered task list.
    ///
    /// Candidates are searched in local time and then checked as instants:
    /// a slot must keep its exact length, start no earlier than `now` (and
    /// no earlier than any task with an earlier due date), and overlap
    /// nothing already busy. Local-only checks miss repeated and skipped
    /// wall-clock hours.
    fn allocate(
        &self,
        tasks: &[Task],
        preferences: &UserSchedulingPreferences,
        committed: &[Interval],
        now: DateTime<Utc>,
        external: &HashMap<String, ExternalSuggestion>,
    ) -> Vec<ScheduleSuggestion> {
        let converter = TimezoneConverter::new(preferences.timezone.as_deref());
        let finder = SlotFinder::new(self.options.step_minutes);
        let window = preferences.window;
        let now_local = converter.to_zoned(now);
        let now_floor = snap_to_minute(now.naive_utc()).and_utc();

        let mut busy_utc: Vec<Interval> = committed.to_vec();
        let mut busy_local: Vec<LocalInterval> = committed
            .iter()
            .map(|b| converter.interval_to_zoned(b))
            .collect();
        // (due, start) of every dated task placed so far
        let mut dated_starts: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
        let mut results = Vec::with_capacity(tasks.len());

        for task in order_tasks(tasks) {
            let duration_minutes = i64::from(
                task.effort_minutes
                    .unwrap_or(preferences.default_duration_minutes)
                    .max(self.options.min_duration_minutes),
            );
            let duration = Duration::minutes(duration_minutes);
            let hint = external.get(&task.id);

            let due_floor = task.due_at.and_then(|due| {
                dated_starts
                    .iter()
                    .filter(|(d, _)| *d < due)
                    .map(|(_, start)| *start)
                    .max()
            });
            let not_before = due_floor.map_or(now_floor, |floor| floor.max(now_floor));

            let desired = match (hint, task.due_at) {
                (Some(h), _) => h.start_at,
                (None, Some(due)) if due - duration > now => due - duration,
                _ => now,
            };
            let anchor = converter
                .to_zoned(desired)
                .max(now_local)
                .max(converter.to_zoned(not_before));

            let fits = |slot: &Interval| {
                slot.end_at - slot.start_at == duration
                    && slot.start_at >= not_before
                    && !busy_utc.iter().any(|b| b.overlaps(slot))
            };
            let accept = |local: &LocalInterval| fits(&converter.interval_to_utc(local));

            let placed = match self.search_days(
                &finder,
                anchor,
                duration_minutes,
                window,
                &busy_local,
                accept,
            ) {
                Some(local_slot) => converter.interval_to_utc(&local_slot),
                None => {
                    tracing::debug!(task_id = %task.id, "search exhausted, placing after latest busy time");
                    let local_slot = Self::after_latest_busy(anchor, duration, window, &busy_local);
                    let candidate = converter.interval_to_utc(&local_slot);
                    if fits(&candidate) {
                        candidate
                    } else {
                        Self::after_latest_busy_utc(not_before, duration, &busy_utc)
                    }
                }
            };

            busy_utc.push(placed);
            busy_local.push(converter.interval_to_zoned(&placed));
            if let Some(due) = task.due_at {
                dated_starts.push((due, placed.start_at));
            }

            let origin = if hint.is_some() {
                SuggestionOrigin::Model
            } else {
                SuggestionOrigin::Fallback
            };
            tracing::debug!(
                task_id = %task.id,
                start = %placed.start_at,
                end = %placed.end_at,
                ?origin,
                "allocated task"
            );

            results.push(ScheduleSuggestion {
                task_id: task.id.clone(),
                start_at: placed.start_at,
                end_at: placed.end_at,
                origin,
                rationale: hint.and_then(|h| h.rationale.clone()),
                confidence: hint.and_then(|h| h.confidence),
            });
        }

        results
    }

    /// Try the anchor day, then each following day from its window start.
    fn search_days<F>(
        &self,
        finder: &SlotFinder,
        anchor: NaiveDateTime,
        duration_minutes: i64,
        window: WorkWindow,
        busy: &[LocalInterval],
        accept: F,
    ) -> Option<LocalInterval>
    where
        F: Fn(&LocalInterval) -> bool,
    {
        let mut day_anchor = anchor;
        for _ in 0..self.options.max_search_days {
            if let Some(slot) =
                finder.find_slot_where(day_anchor, duration_minutes, window, busy, &accept)
            {
                return Some(slot);
            }
            day_anchor = next_window_start(day_anchor, window)?;
        }
        None
    }

    /// Place right after the latest busy end, clamped into the work window.
    ///
    /// Lands after every busy interval seen so far, so it cannot overlap
    /// any of them.
    fn after_latest_busy(
        anchor: NaiveDateTime,
        duration: Duration,
        window: WorkWindow,
        busy: &[LocalInterval],
    ) -> LocalInterval {
        let latest = busy.iter().map(|b| b.end).max().unwrap_or(anchor).max(anchor);
        let mut start = ceil_to_minute(latest);

        let (window_start, window_end) = window_bounds(start.date(), window);
        if start < window_start {
            start = window_start;
        } else if start + duration > window_end {
            start = next_window_start(start, window).unwrap_or(start);
        }

        LocalInterval::new(start, start + duration)
    }

    /// Same placement on the absolute timeline, ignoring the window.
    ///
    /// Used when the local placement lands in a repeated or skipped hour.
    fn after_latest_busy_utc(
        not_before: DateTime<Utc>,
        duration: Duration,
        busy: &[Interval],
    ) -> Interval {
        let latest = busy
            .iter()
            .map(|b| b.end_at)
            .max()
            .map_or(not_before, |end| end.max(not_before));
        let start = ceil_to_minute(latest.naive_utc()).and_utc();
        Interval {
            start_at: start,
            end_at: start + duration,
        }
    }
}

impl Default for SuggestionEngine {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestHttpClient::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Priority;
    use chrono::TimeZone;

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    fn prefs(window: WorkWindow) -> UserSchedulingPreferences {
        UserSchedulingPreferences {
            window,
            default_duration_minutes: 60,
            ..Default::default()
        }
    }

    #[test]
    fn ordering_uses_due_then_priority_then_creation() {
        let created = utc(1, 0, 0);
        let tasks = vec![
            Task::new("undated-high", "x", created).with_priority(Priority::High),
            Task::new("late", "x", created).with_due(utc(5, 0, 0)),
            Task::new("early-low", "x", created)
                .with_due(utc(3, 0, 0))
                .with_priority(Priority::Low),
            Task::new("early-high-newer", "x", utc(1, 1, 0))
                .with_due(utc(3, 0, 0))
                .with_priority(Priority::High),
            Task::new("early-high-older", "x", created)
                .with_due(utc(3, 0, 0))
                .with_priority(Priority::High),
        ];
        let ids: Vec<&str> = order_tasks(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "early-high-older",
                "early-high-newer",
                "early-low",
                "late",
                "undated-high"
            ]
        );
    }

    #[test]
    fn ceil_rounds_partial_minutes_up() {
        let base = utc(1, 10, 0).naive_utc();
        assert_eq!(ceil_to_minute(base), base);
        assert_eq!(
            ceil_to_minute(base + Duration::seconds(1)),
            base + Duration::minutes(1)
        );
    }

    #[test]
    fn fallback_clamps_into_next_window() {
        let busy = vec![LocalInterval::new(
            utc(1, 9, 0).naive_utc(),
            utc(1, 17, 30).naive_utc(),
        )];
        let slot = SuggestionEngine::after_latest_busy(
            utc(1, 7, 0).naive_utc(),
            Duration::minutes(60),
            WorkWindow::new(9, 18),
            &busy,
        );
        assert_eq!(slot.start, utc(2, 9, 0).naive_utc());
        assert_eq!(slot.end, utc(2, 10, 0).naive_utc());
    }

    #[test]
    fn fallback_moves_early_start_to_window_open() {
        let busy = vec![LocalInterval::new(
            utc(1, 2, 0).naive_utc(),
            utc(1, 3, 0).naive_utc(),
        )];
        let slot = SuggestionEngine::after_latest_busy(
            utc(1, 1, 0).naive_utc(),
            Duration::minutes(30),
            WorkWindow::new(9, 18),
            &busy,
        );
        assert_eq!(slot.start, utc(1, 9, 0).naive_utc());
    }

    #[tokio::test]
    async fn fully_booked_month_uses_latest_busy_fallback() {
        let engine = SuggestionEngine::default().with_options(EngineOptions {
            max_search_days: 3,
            ..Default::default()
        });
        let committed = vec![
            Interval::new(utc(1, 0, 0), utc(4, 0, 0)).unwrap(),
            Interval::new(utc(20, 8, 0), utc(20, 12, 0)).unwrap(),
        ];
        let tasks = vec![Task::new("t", "Essay", utc(1, 0, 0))];

        let out = engine
            .suggest(&tasks, &prefs(WorkWindow::new(8, 18)), &committed, utc(1, 6, 0))
            .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].start_at, utc(20, 12, 0));
        assert_eq!(out[0].origin, SuggestionOrigin::Fallback);
    }

    #[tokio::test]
    async fn effort_below_minimum_is_raised() {
        let engine = SuggestionEngine::default();
        let tasks = vec![Task::new("t", "Quiz", utc(1, 0, 0)).with_effort(5)];
        let out = engine
            .suggest(&tasks, &prefs(WorkWindow::new(8, 18)), &[], utc(1, 9, 0))
            .await;
        assert_eq!(out[0].end_at - out[0].start_at, Duration::minutes(15));
    }

    #[tokio::test]
    async fn past_due_task_starts_now() {
        let engine = SuggestionEngine::default();
        let tasks = vec![Task::new("t", "Overdue", utc(1, 0, 0)).with_due(utc(1, 8, 0))];
        let out = engine
            .suggest(&tasks, &prefs(WorkWindow::new(8, 18)), &[], utc(1, 10, 0))
            .await;
        assert_eq!(out[0].start_at, utc(1, 10, 0));
    }

    #[tokio::test]
    async fn repeated_fall_back_hour_never_overlaps_committed_time() {
        let engine = SuggestionEngine::default();
        let nov3 = |h: u32, m: u32| Utc.with_ymd_and_hms(2024, 11, 3, h, m, 0).unwrap();
        // 00:00-01:00 EDT and 01:30 EDT-01:30 EST
        let committed = vec![
            Interval::new(nov3(4, 0), nov3(5, 0)).unwrap(),
            Interval::new(nov3(5, 30), nov3(6, 30)).unwrap(),
        ];
        let prefs = UserSchedulingPreferences {
            timezone: Some("America/New_York".to_string()),
            ..prefs(WorkWindow::new(0, 24))
        };
        let tasks = vec![Task::new("t", "Essay", nov3(0, 0)).with_effort(60)];

        let out = engine.suggest(&tasks, &prefs, &committed, nov3(4, 0)).await;
        assert_eq!(out.len(), 1);
        let placed = out[0].interval();
        assert_eq!(placed.end_at - placed.start_at, Duration::minutes(60));
        assert!(committed.iter().all(|c| !c.overlaps(&placed)), "{placed:?}");
        assert!(placed.start_at >= nov3(4, 0));
    }

    #[test]
    fn utc_fallback_lands_after_latest_busy_end() {
        let busy = vec![
            Interval::new(utc(1, 9, 0), utc(1, 10, 0)).unwrap(),
            Interval::new(utc(1, 11, 0), utc(1, 11, 30)).unwrap(),
        ];
        let placed = SuggestionEngine::after_latest_busy_utc(
            utc(1, 8, 0) + Duration::seconds(20),
            Duration::minutes(45),
            &busy,
        );
        assert_eq!(placed.start_at, utc(1, 11, 30));
        assert_eq!(placed.end_at, utc(1, 12, 15));

        let placed = SuggestionEngine::after_latest_busy_utc(
            utc(1, 12, 0) + Duration::seconds(20),
            Duration::minutes(45),
            &busy,
        );
        assert_eq!(placed.start_at, utc(1, 12, 1));
    }

    #[tokio::test]
    async fn earlier_due_keeps_its_lead_off_grid() {
        let engine = SuggestionEngine::default();
        let created = utc(1, 0, 0);
        let tasks = vec![
            Task::new("later", "x", created)
                .with_due(utc(1, 8, 20))
                .with_effort(15),
            Task::new("earlier", "x", created)
                .with_due(utc(1, 8, 15))
                .with_effort(15),
        ];
        let committed = vec![
            Interval::new(utc(1, 8, 0), utc(1, 8, 5)).unwrap(),
            Interval::new(utc(1, 8, 20), utc(1, 9, 0)).unwrap(),
        ];

        let out = engine
            .suggest(&tasks, &prefs(WorkWindow::new(8, 20)), &committed, utc(1, 6, 0))
            .await;
        let start = |id: &str| out.iter().find(|s| s.task_id == id).map(|s| s.start_at);
        assert_eq!(start("earlier"), Some(utc(1, 9, 0)));
        assert_eq!(start("later"), Some(utc(1, 9, 15)));
    }

    #[tokio::test]
    async fn undated_tasks_are_not_held_behind_dated_ones() {
        let engine = SuggestionEngine::default();
        let created = utc(1, 0, 0);
        let tasks = vec![
            Task::new("dated", "x", created)
                .with_due(utc(3, 12, 0))
                .with_effort(30),
            Task::new("undated", "x", created).with_effort(30),
        ];

        let out = engine
            .suggest(&tasks, &prefs(WorkWindow::new(8, 20)), &[], utc(1, 9, 0))
            .await;
        let start = |id: &str| out.iter().find(|s| s.task_id == id).map(|s| s.start_at);
        assert_eq!(start("dated"), Some(utc(3, 11, 30)));
        assert_eq!(start("undated"), Some(utc(1, 9, 0)));
    }

    #[tokio::test]
    async fn empty_batch_returns_nothing() {
        let engine = SuggestionEngine::default();
        let out = engine
            .suggest(&[], &prefs(WorkWindow::default()), &[], utc(1, 0, 0))
            .await;
        assert!(out.is_empty());
    }
}
