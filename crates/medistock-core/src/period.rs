//! # Fiscal Period Arithmetic
//!
//! Pure, side-effect-free computation of reporting period boundaries.
//!
//! ## The Reporting Calendar
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Fixed-Cutoff Reporting Periods                       │
//! │                                                                         │
//! │  Cutoff day D = 20. A period ENDS on day 20 and SPANS                  │
//! │  [21st of the previous month, 20th of this month].                     │
//! │                                                                         │
//! │   Feb 21          Mar 20   Mar 21          Apr 20                      │
//! │   ├────────────────┤       ├────────────────┤                          │
//! │   │  March period  │       │  April period  │                          │
//! │   └────────────────┘       └────────────────┘                          │
//! │          ▲                                                              │
//! │          │ inventory_begin = period end (physical counting starts      │
//! │          │ on the cutoff day itself)                                   │
//! │                                                                         │
//! │  Reference date on or before the 20th → period ends this month.        │
//! │  Reference date after the 20th        → period ends next month.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every period end falls on day 20, which exists in every month, so
//! month-length clamping never actually bites; the shift functions still go
//! through the cutoff constructor so the invariant is explicit.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar day of month every reporting period ends on.
pub const REPORT_CUTOFF_DAY: u32 = 20;

// =============================================================================
// Period
// =============================================================================

/// A fixed-cutoff fiscal reporting window.
///
/// Value object; derived from a reference date, never persisted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// First day of the window (day 21 of the preceding month).
    pub begin: NaiveDate,

    /// Last day of the window (the cutoff day).
    pub end: NaiveDate,

    /// The date physical counting may start; equals `end`.
    pub inventory_begin: NaiveDate,
}

impl Period {
    /// Returns the period containing `reference`.
    ///
    /// ## Example
    /// A reference of 2024-03-20 yields begin 2024-02-21, end 2024-03-20;
    /// 2024-03-21 already belongs to the period ending 2024-04-20.
    pub fn containing(reference: NaiveDate) -> Period {
        let (end_year, end_month) = if reference.day() <= REPORT_CUTOFF_DAY {
            (reference.year(), reference.month())
        } else {
            month_after(reference.year(), reference.month())
        };

        Period::ending(cutoff_date(end_year, end_month))
    }

    /// Returns the period ending on the given cutoff date.
    fn ending(end: NaiveDate) -> Period {
        let (begin_year, begin_month) = month_before(end.year(), end.month());
        let begin = first_day_after_cutoff(begin_year, begin_month);

        Period {
            begin,
            end,
            inventory_begin: end,
        }
    }

    /// The period exactly one calendar month later.
    pub fn next(&self) -> Period {
        let (year, month) = month_after(self.end.year(), self.end.month());
        Period::ending(cutoff_date(year, month))
    }

    /// The period exactly one calendar month earlier.
    pub fn previous(&self) -> Period {
        let (year, month) = month_before(self.end.year(), self.end.month());
        Period::ending(cutoff_date(year, month))
    }

    /// Whether `date` falls inside this period (begin and end inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.begin && date <= self.end
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} .. {}", self.begin, self.end)
    }
}

// =============================================================================
// Missed Periods
// =============================================================================

/// Counts whole reporting periods elapsed between the last completed form and
/// the schedule implied by `reference`.
///
/// The period containing `reference` is still in progress and is not counted.
/// `None` for `last_completed_end` means no form has ever been completed;
/// that facility is in its FIRST period, not behind, so the count is zero.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use medistock_core::period::missed_periods;
///
/// let last = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
/// let reference = NaiveDate::from_ymd_opt(2024, 3, 25).unwrap();
///
/// // Feb-20 and Mar-20 periods were skipped; the Apr-20 one is in progress.
/// assert_eq!(missed_periods(Some(last), reference), 2);
/// ```
pub fn missed_periods(last_completed_end: Option<NaiveDate>, reference: NaiveDate) -> u32 {
    let Some(last_end) = last_completed_end else {
        return 0;
    };

    let current = Period::containing(reference);
    let mut period = Period::containing(last_end);
    let mut missed = 0;

    loop {
        period = period.next();
        if period.end >= current.end {
            break;
        }
        missed += 1;
    }

    missed
}

// =============================================================================
// Date Helpers
// =============================================================================

/// The cutoff date (day 20) of the given month.
fn cutoff_date(year: i32, month: u32) -> NaiveDate {
    // Day 20 exists in every month of every year.
    NaiveDate::from_ymd_opt(year, month, REPORT_CUTOFF_DAY)
        .expect("cutoff day exists in every month")
}

/// The day after the cutoff (day 21) of the given month.
fn first_day_after_cutoff(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, REPORT_CUTOFF_DAY + 1)
        .expect("day after cutoff exists in every month")
}

fn month_after(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn month_before(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_containing_on_cutoff_day() {
        let period = Period::containing(date(2024, 3, 20));

        assert_eq!(period.begin, date(2024, 2, 21));
        assert_eq!(period.end, date(2024, 3, 20));
        assert_eq!(period.inventory_begin, date(2024, 3, 20));
    }

    #[test]
    fn test_containing_after_cutoff_day() {
        let period = Period::containing(date(2024, 3, 21));

        assert_eq!(period.begin, date(2024, 3, 21));
        assert_eq!(period.end, date(2024, 4, 20));
    }

    #[test]
    fn test_containing_mid_period() {
        let period = Period::containing(date(2024, 3, 1));

        assert_eq!(period.begin, date(2024, 2, 21));
        assert_eq!(period.end, date(2024, 3, 20));
    }

    #[test]
    fn test_next_previous_round_trip() {
        // next(previous(p)) == p across ordinary months and a year boundary
        for reference in [
            date(2024, 3, 10),
            date(2024, 12, 25),
            date(2025, 1, 5),
            date(2024, 2, 29),
        ] {
            let period = Period::containing(reference);
            assert_eq!(period.previous().next(), period);
            assert_eq!(period.next().previous(), period);
        }
    }

    #[test]
    fn test_year_boundary() {
        let period = Period::containing(date(2025, 1, 5));

        assert_eq!(period.begin, date(2024, 12, 21));
        assert_eq!(period.end, date(2025, 1, 20));

        let next = period.next();
        assert_eq!(next.begin, date(2025, 1, 21));
        assert_eq!(next.end, date(2025, 2, 20));
    }

    #[test]
    fn test_contains() {
        let period = Period::containing(date(2024, 3, 10));

        assert!(period.contains(date(2024, 2, 21)));
        assert!(period.contains(date(2024, 3, 20)));
        assert!(!period.contains(date(2024, 2, 20)));
        assert!(!period.contains(date(2024, 3, 21)));
    }

    #[test]
    fn test_missed_periods_counts_whole_gaps() {
        let last = date(2024, 1, 20);

        // Reference inside the Apr-20 period: Feb and Mar were skipped
        assert_eq!(missed_periods(Some(last), date(2024, 3, 25)), 2);

        // Reference inside the very next period: nothing skipped
        assert_eq!(missed_periods(Some(last), date(2024, 2, 10)), 0);
    }

    #[test]
    fn test_missed_periods_first_period_is_not_missed() {
        assert_eq!(missed_periods(None, date(2024, 3, 25)), 0);
    }

    #[test]
    fn test_missed_periods_across_year_boundary() {
        let last = date(2024, 11, 20);

        // Dec-20 and Jan-20 periods skipped, Feb-20 period in progress
        assert_eq!(missed_periods(Some(last), date(2025, 2, 1)), 2);
    }
}
