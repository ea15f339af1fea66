//! Property tests for timezone conversion and batch allocation.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use studyplan_core::{
    Interval, Priority, SuggestionEngine, Task, TimezoneConverter, UserSchedulingPreferences,
    WorkWindow,
};

const ZONES: &[&str] = &[
    "UTC",
    "America/New_York",
    "America/Los_Angeles",
    "Europe/Berlin",
    "Asia/Tokyo",
    "Asia/Kolkata",
    "Australia/Sydney",
    "America/Sao_Paulo",
];

/// Zones allocated across, including two with DST changes in the base weeks.
const ALLOCATION_ZONES: &[&str] = &["UTC", "America/New_York", "Europe/Berlin", "Asia/Tokyo"];

/// Start days: a quiet week plus the 2024 DST change days for New York and Berlin.
const BASE_DAYS: &[(u32, u32)] = &[(1, 1), (3, 10), (3, 31), (11, 3), (10, 27)];

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn base_day((month, day): (u32, u32)) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, 0, 0, 0).unwrap()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low)
    ]
}

/// (due offset hours, effort, priority)
fn task_strategy() -> impl Strategy<Value = (Option<i64>, Option<u32>, Priority)> {
    (
        proptest::option::of(0i64..24 * 10),
        proptest::option::of(1u32..240),
        priority_strategy(),
    )
}

/// (start offset minutes, length minutes)
fn busy_strategy() -> impl Strategy<Value = (i64, i64)> {
    (0i64..60 * 24 * 7, 1i64..600)
}

proptest! {
    #[test]
    fn round_trip_is_within_one_second(
        secs in 946_684_800i64..2_208_988_800i64,
        zone in proptest::sample::select(ZONES),
    ) {
        let converter = TimezoneConverter::new(Some(zone));
        let instant = Utc.timestamp_opt(secs, 0).unwrap();
        let local = converter.to_zoned(instant);
        let back = converter.to_utc(local);

        let exact = (back - instant).num_seconds().abs() <= 1;
        // repeated fall-back hours map to one of two instants
        let ambiguous = converter.is_ambiguous(local) && converter.to_zoned(back) == local;
        prop_assert!(exact || ambiguous, "{zone}: {instant} -> {local} -> {back}");
    }

    #[test]
    fn suggestions_are_valid_and_disjoint(
        tasks in proptest::collection::vec(task_strategy(), 1..8),
        busy in proptest::collection::vec(busy_strategy(), 0..12),
        zone in proptest::sample::select(ALLOCATION_ZONES),
        day in proptest::sample::select(BASE_DAYS),
        start_hour in 0u32..12,
        span in 1u32..13,
        now_offset in 0i64..60 * 24,
    ) {
        let base = || base_day(day);
        let now = base() + Duration::minutes(now_offset);
        let tasks: Vec<Task> = tasks
            .into_iter()
            .enumerate()
            .map(|(i, (due, effort, priority))| {
                let mut task = Task::new(format!("t{i}"), "Task", base() + Duration::minutes(i as i64))
                    .with_priority(priority);
                if let Some(h) = due {
                    task = task.with_due(base() + Duration::hours(h));
                }
                if let Some(m) = effort {
                    task = task.with_effort(m);
                }
                task
            })
            .collect();
        let committed: Vec<Interval> = busy
            .into_iter()
            .map(|(start, len)| {
                let s = base() + Duration::minutes(start);
                Interval::new(s, s + Duration::minutes(len)).unwrap()
            })
            .collect();
        let prefs = UserSchedulingPreferences {
            timezone: Some(zone.to_string()),
            window: WorkWindow::new(start_hour, start_hour + span),
            default_duration_minutes: 60,
            ..Default::default()
        };

        let out = runtime().block_on(SuggestionEngine::default().suggest(&tasks, &prefs, &committed, now));

        prop_assert_eq!(out.len(), tasks.len());
        for s in &out {
            prop_assert!(s.end_at > s.start_at);
            prop_assert!(s.start_at >= now - Duration::minutes(1));
            prop_assert!(committed.iter().all(|c| !c.overlaps(&s.interval())));
        }
        for (i, a) in out.iter().enumerate() {
            for b in &out[i + 1..] {
                prop_assert!(!a.interval().overlaps(&b.interval()), "{:?} overlaps {:?}", a, b);
            }
        }
        for pair in out.windows(2) {
            prop_assert!(pair[0].start_at <= pair[1].start_at);
        }
    }

    #[test]
    fn earlier_due_never_starts_later(
        due_a in 0i64..24 * 5,
        gap in 1i64..48,
        effort in 1u32..180,
        busy in proptest::collection::vec((0i64..60 * 24 * 6, 1i64..360), 0..10),
        now_minute in 0i64..60 * 24,
    ) {
        let created = base();
        let tasks = vec![
            Task::new("later", "x", created)
                .with_due(base() + Duration::hours(due_a + gap))
                .with_effort(effort),
            Task::new("earlier", "x", created)
                .with_due(base() + Duration::hours(due_a))
                .with_effort(effort),
        ];
        let committed: Vec<Interval> = busy
            .into_iter()
            .map(|(start, len)| {
                let s = base() + Duration::minutes(start);
                Interval::new(s, s + Duration::minutes(len)).unwrap()
            })
            .collect();
        let prefs = UserSchedulingPreferences {
            window: WorkWindow::new(8, 20),
            ..Default::default()
        };
        let now = base() + Duration::minutes(now_minute);

        let out = runtime().block_on(SuggestionEngine::default().suggest(&tasks, &prefs, &committed, now));
        let start = |id: &str| out.iter().find(|s| s.task_id == id).map(|s| s.start_at);
        prop_assert!(start("earlier") <= start("later"));
    }
}
