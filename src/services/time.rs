//! Wall-clock arithmetic and time zone conversion.
//!
//! Times of day are carried as minutes since local midnight. Everything that
//! crosses between a location's wall clock and the UTC timeline goes through
//! [`LocalClock`].

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::errors::AppError;

pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// A half-open `[start, end)` span of wall-clock minutes within one local day.
///
/// `end` may exceed [`MINUTES_PER_DAY`] for an appointment running past
/// midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: i32,
    pub end: i32,
}

impl Interval {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }
}

/// Parses `HH:MM` or `HH:MM:SS` into minutes since midnight. Seconds are
/// validated but dropped.
pub fn time_to_minutes(t: &str) -> Result<i32, AppError> {
    let parts: Vec<&str> = t.trim().split(':').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err(AppError::validation(format!("invalid time format: {t}")));
    }

    let field = |s: &str, max: i32| -> Result<i32, AppError> {
        if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::validation(format!("invalid time format: {t}")));
        }
        let v: i32 = s
            .parse()
            .map_err(|_| AppError::validation(format!("invalid time format: {t}")))?;
        if !(0..=max).contains(&v) {
            return Err(AppError::validation(format!("time out of range: {t}")));
        }
        Ok(v)
    };

    let hour = field(parts[0], 23)?;
    let minute = field(parts[1], 59)?;
    if let Some(sec) = parts.get(2) {
        field(sec, 59)?;
    }

    Ok(hour * 60 + minute)
}

/// Formats minutes since midnight as `HH:MM:00`.
pub fn minutes_to_time(m: i32) -> String {
    format!("{}:00", display_time(m))
}

/// Formats minutes since midnight as `HH:MM`, wrapping past midnight.
pub fn display_time(m: i32) -> String {
    let m = m.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", m / 60, m % 60)
}

pub fn add_minutes(t: &str, d: i32) -> Result<String, AppError> {
    Ok(minutes_to_time(time_to_minutes(t)? + d))
}

/// Half-open overlap: an interval ending exactly when another starts does not
/// overlap it.
pub fn overlaps<T: PartialOrd>(start_a: T, end_a: T, start_b: T, end_b: T) -> bool {
    start_a < end_b && end_a > start_b
}

/// A location's wall clock, bound to its IANA time zone.
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    tz: Tz,
}

impl LocalClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn for_zone(name: &str) -> Result<Self, AppError> {
        let tz: Tz = name
            .parse()
            .map_err(|_| AppError::validation(format!("unknown time zone: {name}")))?;
        Ok(Self::new(tz))
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.tz).naive_local()
    }

    /// The instant at which the wall clock reads `minutes` past midnight on
    /// `date`. Ambiguous readings resolve to the earlier instant; readings
    /// inside a spring-forward gap are pushed forward by the gap length.
    pub fn to_instant(&self, date: NaiveDate, minutes: i32) -> DateTime<Utc> {
        let naive = date.and_time(NaiveTime::MIN) + Duration::minutes(minutes as i64);
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            LocalResult::None => {
                // Gaps never last more than a few hours; read the offset in
                // force before it started.
                let before = self
                    .tz
                    .offset_from_utc_datetime(&(naive - Duration::hours(3)))
                    .fix();
                let utc = naive - Duration::seconds(before.local_minus_utc() as i64);
                Utc.from_utc_datetime(&utc)
            }
        }
    }

    /// Instants of local midnight on `date` and on the following day.
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.to_instant(date, 0);
        let end = match date.succ_opt() {
            Some(next) => self.to_instant(next, 0),
            None => start + Duration::hours(24),
        };
        (start, end)
    }

    /// Wall-clock minutes between local midnight of `date` and `instant`.
    pub fn minutes_into_day(&self, date: NaiveDate, instant: DateTime<Utc>) -> i32 {
        let local = self.to_local(instant);
        (local - date.and_time(NaiveTime::MIN)).num_minutes() as i32
    }

    pub fn to_zoned(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        let local = instant.with_timezone(&self.tz);
        local.with_timezone(&local.offset().fix())
    }
}
