//! Age and season arithmetic.
//!
//! Everything here is a pure function of two calendar dates in the
//! dashboard's fixed home timezone (UTC+9). Callers supply "now" from that
//! zone so results stay reproducible regardless of where the binary runs;
//! [`today_at_home`] is the one sanctioned way to obtain it.

use chrono::{Datelike, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Offset of the dashboard's home timezone, in seconds east of UTC.
const HOME_OFFSET_SECS: i32 = 9 * 3600;

/// Elapsed age relative to a birth date.
///
/// All fields are non-negative for any `now >= birth`; the birth date
/// itself counts as day 1 of `total_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeSnapshot {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub total_days: u64,
}

impl fmt::Display for AgeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} years {} months {} days (D+{})",
            self.years, self.months, self.days, self.total_days
        )
    }
}

/// Seasonal bucket of a calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Bucket a month number (1-12) into its season.
    pub fn of_month(month: u32) -> Season {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
        };
        write!(f, "{name}")
    }
}

/// Which n-th season of its kind "now" falls in, counted from birth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonSnapshot {
    pub season: Season,
    pub ordinal: i32,
}

impl fmt::Display for SeasonSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} no. {}", self.season, self.ordinal)
    }
}

/// Today's date in the dashboard's home timezone.
pub fn today_at_home() -> NaiveDate {
    let offset = FixedOffset::east_opt(HOME_OFFSET_SECS).expect("valid fixed offset");
    Utc::now().with_timezone(&offset).date_naive()
}

/// Compute elapsed years/months/days and the running day count.
///
/// Borrow rules: a negative day difference borrows the length of the
/// calendar month immediately preceding `now` (with December/January
/// wraparound); a negative month difference after that borrows 12 months
/// from the years. Callers must ensure `now >= birth`.
pub fn compute_age(birth: NaiveDate, now: NaiveDate) -> AgeSnapshot {
    let mut years = now.year() - birth.year();
    let mut months = now.month() as i32 - birth.month() as i32;
    let mut days = now.day() as i32 - birth.day() as i32;

    if days < 0 {
        months -= 1;
        let (prev_year, prev_month) = if now.month() == 1 {
            (now.year() - 1, 12)
        } else {
            (now.year(), now.month() - 1)
        };
        days += days_in_month(prev_year, prev_month) as i32;
    }

    if months < 0 {
        years -= 1;
        months += 12;
    }

    let total_days = (now - birth).num_days() + 1;

    AgeSnapshot {
        years: years.max(0) as u32,
        months: months.max(0) as u32,
        days: days.max(0) as u32,
        total_days: total_days.max(0) as u64,
    }
}

/// Compute the season bucket of `now` and its ordinal counted from birth.
///
/// January and February belong to the winter that began the previous
/// December, so their reference year is `now.year() - 1`.
pub fn compute_season(birth: NaiveDate, now: NaiveDate) -> SeasonSnapshot {
    let season = Season::of_month(now.month());
    let reference_year = match season {
        Season::Winter if now.month() != 12 => now.year() - 1,
        _ => now.year(),
    };
    SeasonSnapshot {
        season,
        ordinal: reference_year - birth.year() + 1,
    }
}

/// Number of days in a calendar month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
