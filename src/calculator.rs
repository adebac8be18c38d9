//! Birthday progress computation.
//!
//! Everything here is a pure function of a [`BirthInstant`] and an explicit
//! evaluation instant. The scheduler supplies `now` once per tick.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::age::Breakdown;
use crate::error::{BirthdayError, Result};

/// Birth date with an optional time of day. A missing time means midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthInstant {
    #[serde(rename = "birth_date")]
    date: NaiveDate,
    #[serde(rename = "birth_time")]
    time: Option<NaiveTime>,
}

impl BirthInstant {
    pub fn new(date: NaiveDate, time: Option<NaiveTime>) -> Self {
        Self { date, time }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Time of day as entered, `None` if the user left it blank.
    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    pub fn at(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(NaiveTime::MIN))
    }

    /// The anniversary falling in `year`. Feb 29 births get Feb 28 in
    /// non-leap years.
    pub fn anniversary_in(&self, year: i32) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(year, self.date.month(), self.date.day()).or_else(|| {
            if self.date.month() == 2 && self.date.day() == 29 {
                NaiveDate::from_ymd_opt(year, 2, 28)
            } else {
                None
            }
        })?;
        Some(date.and_time(self.at().time()))
    }
}

/// Half-open interval `[previous, next)` of consecutive anniversaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnniversaryWindow {
    pub previous: NaiveDateTime,
    pub next: NaiveDateTime,
}

impl AnniversaryWindow {
    /// The window with `previous <= now < next`.
    pub fn containing(birth: &BirthInstant, now: NaiveDateTime) -> Result<Self> {
        let year = now.year();
        let out_of_range =
            || BirthdayError::InvalidInput(format!("no anniversary window around {now}"));

        let candidate = birth.anniversary_in(year).ok_or_else(out_of_range)?;
        let (previous, next) = if candidate <= now {
            let next = year
                .checked_add(1)
                .and_then(|y| birth.anniversary_in(y))
                .ok_or_else(out_of_range)?;
            (candidate, next)
        } else {
            let previous = year
                .checked_sub(1)
                .and_then(|y| birth.anniversary_in(y))
                .ok_or_else(out_of_range)?;
            (previous, candidate)
        };

        Ok(Self { previous, next })
    }

    pub fn length(&self) -> TimeDelta {
        self.next - self.previous
    }

    /// Percentage of the window elapsed at `now`, clamped to `[0, 100]` and
    /// rounded to 4 decimal places.
    pub fn progress_at(&self, now: NaiveDateTime) -> f64 {
        let total = self.length().num_milliseconds();
        if total <= 0 {
            return 0.0;
        }
        let elapsed = (now - self.previous).num_milliseconds();
        let percent = elapsed as f64 / total as f64 * 100.0;
        ((percent * 10_000.0).round() / 10_000.0).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressResult {
    pub evaluated_at: NaiveDateTime,
    pub age: Breakdown,
    pub next_anniversary: NaiveDateTime,
    pub time_until: Breakdown,
    pub progress_percentage: f64,
    pub window: AnniversaryWindow,
}

impl ProgressResult {
    /// Birthdays celebrated so far.
    pub fn completed_years(&self, birth: &BirthInstant) -> i32 {
        self.window.previous.year() - birth.date().year()
    }

    pub fn since_previous(&self) -> TimeDelta {
        self.evaluated_at - self.window.previous
    }

    pub fn until_next(&self) -> TimeDelta {
        self.next_anniversary - self.evaluated_at
    }
}

/// Computes age, next anniversary, countdown and progress for `birth` at
/// `now`. Fails with [`BirthdayError::InvalidInput`] when `now` precedes the
/// birth instant.
pub fn evaluate(birth: &BirthInstant, now: NaiveDateTime) -> Result<ProgressResult> {
    let born = birth.at();
    if now < born {
        return Err(BirthdayError::InvalidInput(format!(
            "evaluation instant {now} precedes birth {born}"
        )));
    }

    let window = AnniversaryWindow::containing(birth, now)?;
    let age = Breakdown::between(born, now)
        .ok_or_else(|| BirthdayError::InvalidInput(format!("cannot break down age at {now}")))?;
    let time_until = Breakdown::between(now, window.next).ok_or_else(|| {
        BirthdayError::InvalidInput(format!("cannot break down countdown to {}", window.next))
    })?;

    Ok(ProgressResult {
        evaluated_at: now,
        age,
        next_anniversary: window.next,
        time_until,
        progress_percentage: window.progress_at(now),
        window,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn birth(y: i32, m: u32, d: u32, time: Option<(u32, u32, u32)>) -> BirthInstant {
        BirthInstant::new(
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            time.map(|(h, min, s)| NaiveTime::from_hms_opt(h, min, s).unwrap()),
        )
    }

    #[test]
    fn documented_scenario() {
        let b = birth(2017, 8, 23, Some((20, 27, 0)));
        let result = evaluate(&b, at(2025, 10, 27, 20, 1, 8)).unwrap();

        assert_eq!(result.next_anniversary, at(2026, 8, 23, 20, 27, 0));
        assert_eq!(result.window.previous, at(2025, 8, 23, 20, 27, 0));
        assert_eq!(
            result.age,
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
            result.time_until,
            Breakdown {
                years: 0,
                months: 9,
                weeks: 3,
                days: 6,
                hours: 0,
                minutes: 25,
                seconds: 52,
            }
        );
        assert_eq!(result.completed_years(&b), 8);
        assert!(result.progress_percentage > 17.0 && result.progress_percentage < 18.0);
    }

    #[test]
    fn missing_time_means_midnight_and_anniversary_starts_at_zero() {
        let b = birth(1995, 3, 15, None);
        assert_eq!(b.at(), at(1995, 3, 15, 0, 0, 0));

        for year in [1995, 2000, 2024, 2025] {
            let result = evaluate(&b, at(year, 3, 15, 0, 0, 0)).unwrap();
            assert_eq!(result.progress_percentage, 0.0, "year {year}");
            assert_eq!(result.next_anniversary, at(year + 1, 3, 15, 0, 0, 0));
        }
    }

    #[test]
    fn window_rolls_over_exactly_at_the_anniversary() {
        let b = birth(1990, 7, 1, Some((8, 0, 0)));

        let just_before = evaluate(&b, at(2024, 7, 1, 7, 59, 59)).unwrap();
        assert_eq!(just_before.next_anniversary, at(2024, 7, 1, 8, 0, 0));
        assert!(just_before.progress_percentage > 99.99);
        assert_eq!(
            just_before.time_until,
            Breakdown { seconds: 1, ..Default::default() }
        );

        let on_time = evaluate(&b, at(2024, 7, 1, 8, 0, 0)).unwrap();
        assert_eq!(on_time.progress_percentage, 0.0);
        assert_eq!(on_time.window.previous, at(2024, 7, 1, 8, 0, 0));
        assert_eq!(on_time.next_anniversary, at(2025, 7, 1, 8, 0, 0));
        assert_eq!(on_time.age, Breakdown { years: 34, ..Default::default() });
    }

    #[test]
    fn leap_day_birth_uses_feb_28_in_common_years() {
        let b = birth(2000, 2, 29, None);
        assert_eq!(b.anniversary_in(2023), Some(at(2023, 2, 28, 0, 0, 0)));
        assert_eq!(b.anniversary_in(2024), Some(at(2024, 2, 29, 0, 0, 0)));

        let result = evaluate(&b, at(2023, 1, 10, 12, 0, 0)).unwrap();
        assert_eq!(result.window.previous, at(2022, 2, 28, 0, 0, 0));
        assert_eq!(result.next_anniversary, at(2023, 2, 28, 0, 0, 0));

        let result = evaluate(&b, at(2023, 2, 28, 0, 0, 0)).unwrap();
        assert_eq!(result.progress_percentage, 0.0);
        assert_eq!(result.next_anniversary, at(2024, 2, 29, 0, 0, 0));
        assert_eq!(result.age, Breakdown { years: 23, ..Default::default() });
    }

    #[test]
    fn evaluation_before_birth_is_invalid_input() {
        let b = birth(2020, 5, 5, Some((10, 0, 0)));
        let err = evaluate(&b, at(2020, 5, 5, 9, 59, 59)).unwrap_err();
        assert!(matches!(err, BirthdayError::InvalidInput(_)));
    }

    #[test]
    fn evaluation_at_birth_is_all_zero() {
        let b = birth(2020, 5, 5, Some((10, 0, 0)));
        let result = evaluate(&b, b.at()).unwrap();
        assert_eq!(result.age, Breakdown::default());
        assert_eq!(result.progress_percentage, 0.0);
        assert_eq!(result.next_anniversary, at(2021, 5, 5, 10, 0, 0));
    }

    #[test]
    fn progress_stays_in_range_and_is_repeatable() {
        let births = [
            birth(2000, 2, 29, Some((23, 59, 59))),
            birth(1985, 12, 31, None),
            birth(2010, 1, 1, Some((0, 0, 1))),
        ];
        let mut now = at(2022, 12, 30, 0, 0, 0);
        let end = at(2025, 3, 2, 0, 0, 0);

        while now < end {
            for b in &births {
                let first = evaluate(b, now).unwrap();
                let second = evaluate(b, now).unwrap();
                assert_eq!(first, second);
                assert!((0.0..=100.0).contains(&first.progress_percentage));
                assert!(first.window.previous <= now && now < first.window.next);
                assert_eq!(first.time_until.apply_to(now), Some(first.next_anniversary));
            }
            now += TimeDelta::hours(7) + TimeDelta::minutes(13);
        }
    }

    #[test]
    fn progress_is_rounded_to_four_places() {
        let window = AnniversaryWindow {
            previous: at(2023, 1, 1, 0, 0, 0),
            next: at(2024, 1, 1, 0, 0, 0),
        };
        let p = window.progress_at(at(2023, 1, 1, 0, 0, 1));
        assert_eq!(p, 0.0);
        let p = window.progress_at(at(2023, 7, 2, 12, 0, 0));
        assert_eq!(p, 50.0);
        let p = window.progress_at(at(2023, 1, 2, 0, 0, 0));
        assert_eq!(p, 0.274);
    }
}
