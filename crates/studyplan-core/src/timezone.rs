//! Conversion between absolute instants and zone wall-clock time.
//!
//! The scheduler searches in local wall-clock time (a `NaiveDateTime` as the
//! user reads it off their clock) and stores absolute UTC instants. This
//! module converts between the two for one IANA zone.
//!
//! Converting wall-clock back to UTC cannot simply subtract "the" offset:
//! the offset depends on the instant being solved for, which differs across
//! a DST change. [`TimezoneConverter::to_utc`] therefore iterates, re-deriving
//! the offset from each candidate, and stops once the candidate is stable.
//!
//! A converter with no zone is the identity on every operation. An unknown
//! zone name behaves like UTC; lookups never fail.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::schedule::{Interval, LocalInterval};

/// Upper bound on fixed-point rounds in [`TimezoneConverter::to_utc`].
const MAX_OFFSET_ROUNDS: usize = 5;

/// Stateless converter for one configured zone.
#[derive(Debug, Clone)]
pub struct TimezoneConverter {
    name: Option<String>,
    tz: Option<Tz>,
}

impl TimezoneConverter {
    /// Create a converter for an optional IANA zone name.
    pub fn new(timezone: Option<&str>) -> Self {
        let name = timezone.map(str::trim).filter(|s| !s.is_empty());
        let tz = name.and_then(|n| match n.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(_) => {
                tracing::warn!(timezone = n, "unknown timezone, using zero offset");
                None
            }
        });
        Self {
            name: name.map(str::to_string),
            tz,
        }
    }

    /// Converter that passes UTC through unchanged.
    pub fn utc() -> Self {
        Self {
            name: None,
            tz: None,
        }
    }

    /// The configured zone name, if any (even when it failed to resolve).
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether conversions are plain UTC arithmetic.
    pub fn is_passthrough(&self) -> bool {
        self.tz.is_none()
    }

    /// Offset from UTC in seconds at `instant` (local minus UTC).
    pub fn offset_seconds_at(&self, instant: DateTime<Utc>) -> i32 {
        match self.tz {
            Some(tz) => tz
                .offset_from_utc_datetime(&instant.naive_utc())
                .fix()
                .local_minus_utc(),
            None => 0,
        }
    }

    /// Wall-clock reading of `instant` in the zone.
    pub fn to_zoned(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        let offset = self.offset_seconds_at(instant);
        instant.naive_utc() + Duration::seconds(i64::from(offset))
    }

    /// Absolute instant whose wall-clock reading in the zone is `local`.
    ///
    /// Wall times that occur twice (DST fall-back) resolve to whichever
    /// occurrence the iteration settles on first, which is the earlier one
    /// for zones that move clocks back. Wall times that never occur
    /// (spring-forward gap) resolve to an instant next to the gap.
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        if self.tz.is_none() {
            return local.and_utc();
        }

        let mut candidate = local.and_utc();
        for _ in 0..MAX_OFFSET_ROUNDS {
            let offset = self.offset_seconds_at(candidate);
            let next = (local - Duration::seconds(i64::from(offset))).and_utc();
            if next == candidate {
                break;
            }
            candidate = next;
        }
        candidate
    }

    pub fn interval_to_zoned(&self, interval: &Interval) -> LocalInterval {
        LocalInterval::new(self.to_zoned(interval.start_at), self.to_zoned(interval.end_at))
    }

    /// Convert a local interval back to instants.
    ///
    /// The result is not re-validated; a local interval spanning a DST gap
    /// can collapse, which callers guard against.
    pub fn interval_to_utc(&self, interval: &LocalInterval) -> Interval {
        Interval {
            start_at: self.to_utc(interval.start),
            end_at: self.to_utc(interval.end),
        }
    }

    /// Local calendar date of `instant`.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_zoned(instant).date()
    }

    /// Whether `local` names two distinct instants in this zone.
    pub fn is_ambiguous(&self, local: NaiveDateTime) -> bool {
        match self.tz {
            Some(tz) => matches!(
                tz.from_local_datetime(&local),
                chrono::LocalResult::Ambiguous(_, _)
            ),
            None => false,
        }
    }
}

impl Default for TimezoneConverter {
    fn default() -> Self {
        Self::utc()
    }
}

/// Format an offset in seconds as `+HH:MM`.
pub fn format_offset(offset_seconds: i32) -> String {
    let sign = if offset_seconds >= 0 { "+" } else { "-" };
    let abs = offset_seconds.unsigned_abs();
    format!("{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
}
