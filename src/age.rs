//! age.rs
//!
//! Calendar-aware duration breakdown in the format:
//!     "X years, Y months, Z weeks, D days, H hours, M minutes, and S seconds"
//!
//! Chrono does not provide a year/month diff, so whole months are found by
//! stepping calendar months from the start instant and the remainder is split
//! into fixed units.
//!
//! This logic correctly handles:
//!   • varying month lengths (Jan 31 + 1 month = Feb 28/29)
//!   • leap years
//!   • time-of-day borrowing (a month is only whole once the clock time passes)

use chrono::{Datelike, Months, NaiveDateTime, TimeDelta};
use serde::Serialize;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;

/// A duration decomposed from the largest calendar unit down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub years: u32,
    pub months: u32,
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Breakdown {
    /// Breaks down the span `from..to`. Returns `None` when `to` precedes
    /// `from` or the span runs off chrono's calendar.
    pub fn between(from: NaiveDateTime, to: NaiveDateTime) -> Option<Self> {
        if to < from {
            return None;
        }

        let total_months = whole_months_between(from, to)?;
        let anchor = add_months(from, total_months)?;

        // Sub-second remainder is truncated.
        let secs = (to - anchor).num_seconds();
        let days = secs / SECS_PER_DAY;
        let day_secs = secs % SECS_PER_DAY;

        Some(Self {
            years: total_months / 12,
            months: total_months % 12,
            weeks: (days / 7) as u32,
            days: (days % 7) as u32,
            hours: (day_secs / SECS_PER_HOUR) as u32,
            minutes: (day_secs % SECS_PER_HOUR / SECS_PER_MINUTE) as u32,
            seconds: (day_secs % SECS_PER_MINUTE) as u32,
        })
    }

    /// Whole calendar months covered by the years and months fields.
    pub fn total_months(&self) -> u32 {
        self.years * 12 + self.months
    }

    /// Seconds covered by the weeks..seconds fields.
    pub fn remainder_seconds(&self) -> i64 {
        (self.weeks as i64 * 7 + self.days as i64) * SECS_PER_DAY
            + self.hours as i64 * SECS_PER_HOUR
            + self.minutes as i64 * SECS_PER_MINUTE
            + self.seconds as i64
    }

    /// Adds the breakdown back onto `start`, the inverse of [`Breakdown::between`]
    /// up to the truncated sub-second part.
    pub fn apply_to(&self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        add_months(start, self.total_months())?
            .checked_add_signed(TimeDelta::seconds(self.remainder_seconds()))
    }
}

impl std::fmt::Display for Breakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let units = [
            (self.years, "year"),
            (self.months, "month"),
            (self.weeks, "week"),
            (self.days, "day"),
            (self.hours, "hour"),
            (self.minutes, "minute"),
        ];

        let mut parts: Vec<String> = units
            .iter()
            .filter(|(n, _)| *n > 0)
            .map(|(n, unit)| format!("{n} {unit}{}", plural(*n)))
            .collect();

        if self.seconds > 0 || parts.is_empty() {
            parts.push(format!("{} second{}", self.seconds, plural(self.seconds)));
        }

        match parts.as_slice() {
            [only] => write!(f, "{only}"),
            [first, second] => write!(f, "{first} and {second}"),
            [init @ .., last] => write!(f, "{}, and {last}", init.join(", ")),
            [] => write!(f, "0 seconds"),
        }
    }
}

/// Short age form, e.g. `"27y 153d 04:12:10"`: completed years plus the time
/// elapsed since the last anniversary.
pub fn compact_age(years: i32, since_last: TimeDelta) -> String {
    let (days, clock) = split_days(since_last);
    format!("{years}y {days}d {clock}")
}

/// Short countdown form, e.g. `"45 days, 12:34:56"`.
pub fn compact_countdown(remaining: TimeDelta) -> String {
    let (days, clock) = split_days(remaining);
    format!("{days} days, {clock}")
}

fn split_days(delta: TimeDelta) -> (i64, String) {
    let secs = delta.num_seconds().max(0);
    let day_secs = secs % SECS_PER_DAY;
    let clock = format!(
        "{:02}:{:02}:{:02}",
        day_secs / SECS_PER_HOUR,
        day_secs % SECS_PER_HOUR / SECS_PER_MINUTE,
        day_secs % SECS_PER_MINUTE
    );
    (secs / SECS_PER_DAY, clock)
}

fn plural(n: u32) -> &'static str {
    if n == 1 { "" } else { "s" }
}

fn add_months(start: NaiveDateTime, months: u32) -> Option<NaiveDateTime> {
    start.checked_add_months(Months::new(months))
}

/// Largest `m` with `from + m months <= to`. Assumes `from <= to`.
fn whole_months_between(from: NaiveDateTime, to: NaiveDateTime) -> Option<u32> {
    // Landing in `to`'s own month is the most that can fit; step back if the
    // day/time there is still ahead of `to`.
    let estimate =
        (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    let mut months = estimate.max(0) as u32;

    while months > 0 && add_months(from, months)? > to {
        months -= 1;
    }

    Some(months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn breaks_down_age_with_calendar_months() {
        let birth = at(2017, 8, 23, 20, 27, 0);
        let now = at(2025, 10, 27, 20, 1, 8);

        let b = Breakdown::between(birth, now).unwrap();
        assert_eq!(
            b,
            Breakdown {
                years: 8,
                months: 2,
                weeks: 0,
                days: 3,
                hours: 23,
                minutes: 34,
                seconds: 8,
            }
        );
        assert_eq!(
            b.to_string(),
            "8 years, 2 months, 3 days, 23 hours, 34 minutes, and 8 seconds"
        );
    }

    #[test]
    fn month_end_start_clamps_instead_of_overflowing() {
        // Jan 31 + 1 month is Feb 28, so by Mar 1 one whole month has passed.
        let b = Breakdown::between(at(2023, 1, 31, 0, 0, 0), at(2023, 3, 1, 0, 0, 0)).unwrap();
        assert_eq!(b.months, 1);
        assert_eq!(b.days, 1);

        // Jan 31 + 2 months is Mar 31, so Mar 30 is still one month in.
        let b = Breakdown::between(at(2023, 1, 31, 0, 0, 0), at(2023, 3, 30, 0, 0, 0)).unwrap();
        assert_eq!(b.months, 1);
        assert_eq!(b.weeks, 4);
        assert_eq!(b.days, 2);
    }

    #[test]
    fn month_is_not_whole_until_time_of_day_passes() {
        let b = Breakdown::between(at(2024, 5, 10, 12, 0, 0), at(2024, 6, 10, 11, 59, 59)).unwrap();
        assert_eq!(b.months, 0);
        assert_eq!(b.weeks, 4);
        assert_eq!(b.days, 2);
        assert_eq!((b.hours, b.minutes, b.seconds), (23, 59, 59));
    }

    #[test]
    fn reversed_span_is_rejected() {
        assert!(Breakdown::between(at(2024, 1, 2, 0, 0, 0), at(2024, 1, 1, 0, 0, 0)).is_none());
    }

    #[test]
    fn breakdown_reconstructs_the_end_instant() {
        let cases = [
            (at(1995, 3, 15, 0, 0, 0), at(2025, 10, 27, 20, 1, 8)),
            (at(2000, 2, 29, 6, 30, 0), at(2023, 2, 28, 6, 29, 59)),
            (at(2023, 1, 31, 23, 0, 0), at(2024, 2, 29, 22, 0, 0)),
            (at(2025, 10, 27, 20, 1, 8), at(2026, 8, 23, 20, 27, 0)),
        ];
        for (from, to) in cases {
            let b = Breakdown::between(from, to).unwrap();
            assert_eq!(b.apply_to(from), Some(to), "{from} -> {to}");
        }
    }

    #[test]
    fn display_joins_parts_like_a_sentence() {
        assert_eq!(Breakdown::default().to_string(), "0 seconds");

        let one = Breakdown { weeks: 1, ..Default::default() };
        assert_eq!(one.to_string(), "1 week");

        let two = Breakdown { years: 1, seconds: 2, ..Default::default() };
        assert_eq!(two.to_string(), "1 year and 2 seconds");
    }

    #[test]
    fn compact_forms_pad_the_clock() {
        let since = TimeDelta::days(153) + TimeDelta::seconds(4 * 3600 + 12 * 60 + 10);
        assert_eq!(compact_age(27, since), "27y 153d 04:12:10");
        assert_eq!(compact_countdown(TimeDelta::seconds(45 * 86_400 + 5)), "45 days, 00:00:05");
    }
}
