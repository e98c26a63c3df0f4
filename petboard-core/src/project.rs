//! Calendar month-grid projection.
//!
//! A tiny state machine over a `(year, month)` pointer plus the grid math
//! for one month. The widget's inline script mirrors this logic for
//! client-side navigation; this module is the tested source of truth and
//! renders the initial month. Navigation only moves the pointer; the
//! embedded snapshot is captured once and never re-fetched.

use crate::age::days_in_month;
use crate::calendar::CalendarIndex;
use chrono::{Datelike, NaiveDate};

/// Hover text for a day with no entries.
pub const NO_INFO: &str = "No info";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// The navigable month pointer. Starts at the real current month every
/// render session; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub year: i32,
    pub month: u32,
}

impl ViewState {
    /// Pointer at the month containing `today`.
    pub fn at(today: NaiveDate) -> Self {
        Self {
            year: today.year(),
            month: today.month(),
        }
    }

    /// Advance one month, carrying into the next year after December.
    pub fn next(&mut self) {
        if self.month == 12 {
            self.year += 1;
            self.month = 1;
        } else {
            self.month += 1;
        }
    }

    /// Go back one month, borrowing from the previous year before January.
    pub fn previous(&mut self) {
        if self.month == 1 {
            self.year -= 1;
            self.month = 12;
        } else {
            self.month -= 1;
        }
    }
}

/// One day cell of the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub day: u32,
    /// Zero-padded `YYYY-MM-DD` lookup key.
    pub key: String,
    /// Set only when the pointer sits on the real current month and this
    /// cell is the real current day.
    pub is_today: bool,
    /// Bucket display texts; empty means the cell shows [`NO_INFO`].
    pub entries: Vec<String>,
}

/// A fully computed month grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    /// Heading like "February 2026".
    pub label: String,
    /// Empty cells before day 1 (weekday of day 1, 0 = Sunday).
    pub leading_blanks: u32,
    pub days: Vec<DayCell>,
}

/// Compute the grid for the pointer month against a snapshot index.
pub fn month_view(state: ViewState, index: &CalendarIndex, today: NaiveDate) -> MonthView {
    let leading_blanks = NaiveDate::from_ymd_opt(state.year, state.month, 1)
        .map(|first| first.weekday().num_days_from_sunday())
        .unwrap_or(0);

    let in_current_month = state.year == today.year() && state.month == today.month();
    let month_name = MONTH_NAMES
        .get(state.month as usize - 1)
        .copied()
        .unwrap_or("");

    let days = (1..=days_in_month(state.year, state.month))
        .map(|day| {
            let key = format!("{:04}-{:02}-{:02}", state.year, state.month, day);
            let entries = index
                .get(&key)
                .map(|bucket| bucket.iter().map(|entry| entry.display.clone()).collect())
                .unwrap_or_default();
            DayCell {
                day,
                key,
                is_today: in_current_month && day == today.day(),
                entries,
            }
        })
        .collect();

    MonthView {
        year: state.year,
        month: state.month,
        label: format!("{month_name} {}", state.year),
        leading_blanks,
        days,
    }
}
