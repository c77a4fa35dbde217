//! Gestational-age and due-date arithmetic.
//!
//! Calendar dates are taken at midnight UTC. "Now" is always passed in by
//! the caller (see `ports::Clock`), so every function here is pure.

use crate::domain::entities::Pregnancy;
use crate::domain::errors::DomainError;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard pregnancy length from the first day of the last period (Naegele's rule).
pub const PREGNANCY_LENGTH_DAYS: i64 = 280;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Elapsed time since the last menstrual period. `days` is always within `0..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GestationalAge {
    pub weeks: u32,
    pub days: u32,
}

impl GestationalAge {
    pub fn from_total_days(total: u32) -> Self {
        Self {
            weeks: total / 7,
            days: total % 7,
        }
    }

    pub fn total_days(&self) -> u32 {
        self.weeks * 7 + self.days
    }

    /// 1 before week 13, 2 before week 27, 3 from then on.
    pub fn trimester(&self) -> u8 {
        match self.weeks {
            0..=12 => 1,
            13..=26 => 2,
            _ => 3,
        }
    }
}

/// Clinical shorthand, e.g. `12+3`.
impl fmt::Display for GestationalAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.weeks, self.days)
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::default()).and_utc()
}

/// Gestational age at `as_of`.
///
/// Uses the absolute elapsed time, so an `as_of` before the LMP still yields
/// a non-negative age. A partial day counts as a full day. Use
/// [`gestational_age_checked`] to reject out-of-order dates.
pub fn gestational_age(last_menstruation_date: NaiveDate, as_of: DateTime<Utc>) -> GestationalAge {
    let elapsed = (as_of - midnight_utc(last_menstruation_date))
        .num_milliseconds()
        .abs();
    let total_days = (elapsed + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
    GestationalAge::from_total_days(u32::try_from(total_days).unwrap_or(u32::MAX))
}

/// Gestational age at midnight UTC of `date`.
pub fn gestational_age_on(last_menstruation_date: NaiveDate, date: NaiveDate) -> GestationalAge {
    gestational_age(last_menstruation_date, midnight_utc(date))
}

/// Like [`gestational_age`], but fails with `InvalidDateRange` when `as_of`
/// falls on a calendar day before the LMP.
pub fn gestational_age_checked(
    last_menstruation_date: NaiveDate,
    as_of: DateTime<Utc>,
) -> Result<GestationalAge, DomainError> {
    let as_of_date = as_of.date_naive();
    if as_of_date < last_menstruation_date {
        return Err(DomainError::InvalidDateRange {
            from: last_menstruation_date,
            to: as_of_date,
        });
    }
    Ok(gestational_age(last_menstruation_date, as_of))
}

/// Due date estimate: LMP + 280 days.
pub fn estimated_due_date(last_menstruation_date: NaiveDate) -> NaiveDate {
    last_menstruation_date + Duration::days(PREGNANCY_LENGTH_DAYS)
}

/// Ultrasound dating wins over the LMP-based date when present.
pub fn effective_due_date(pregnancy: &Pregnancy) -> NaiveDate {
    pregnancy
        .ultrasound_due_date
        .unwrap_or(pregnancy.expected_due_date)
}

/// Signed whole days from `today` to `due` (negative once overdue).
pub fn days_until(due: NaiveDate, today: NaiveDate) -> i64 {
    (due - today).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_twelve_weeks_exact() {
        let age = gestational_age_on(d(2024, 1, 1), d(2024, 3, 25));
        assert_eq!(age.total_days(), 84);
        assert_eq!(age, GestationalAge { weeks: 12, days: 0 });
    }

    #[test]
    fn test_one_week_two_days() {
        let age = gestational_age_on(d(2024, 1, 1), d(2024, 1, 10));
        assert_eq!(age, GestationalAge { weeks: 1, days: 2 });
    }

    #[test]
    fn test_same_day_is_zero() {
        let age = gestational_age_on(d(2024, 6, 15), d(2024, 6, 15));
        assert_eq!(age, GestationalAge { weeks: 0, days: 0 });
    }

    #[test]
    fn test_partial_day_rounds_up() {
        let as_of = d(2024, 1, 10).and_hms_opt(0, 0, 1).unwrap().and_utc();
        let age = gestational_age(d(2024, 1, 1), as_of);
        assert_eq!(age.total_days(), 10);
        assert_eq!(age, GestationalAge { weeks: 1, days: 3 });

        let half_second = d(2024, 1, 10).and_hms_milli_opt(0, 0, 0, 500).unwrap().and_utc();
        assert_eq!(gestational_age(d(2024, 1, 1), half_second).total_days(), 10);
        let one_milli = d(2024, 1, 10).and_hms_milli_opt(0, 0, 0, 1).unwrap().and_utc();
        assert_eq!(gestational_age(d(2024, 1, 1), one_milli).total_days(), 10);
        let midnight = d(2024, 1, 10).and_hms_opt(0, 0, 0).unwrap().and_utc();
        assert_eq!(gestational_age(d(2024, 1, 1), midnight).total_days(), 9);
    }

    #[test]
    fn test_reversed_dates_are_absolute() {
        let age = gestational_age_on(d(2024, 1, 10), d(2024, 1, 1));
        assert_eq!(age, GestationalAge { weeks: 1, days: 2 });
    }

    #[test]
    fn test_checked_rejects_reversed_dates() {
        let as_of = midnight_utc(d(2023, 12, 31));
        let err = gestational_age_checked(d(2024, 1, 1), as_of).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidDateRange { from, to } if from == d(2024, 1, 1) && to == d(2023, 12, 31)
        ));
    }

    #[test]
    fn test_checked_accepts_later_same_day() {
        let as_of = d(2024, 1, 1).and_hms_opt(15, 30, 0).unwrap().and_utc();
        let age = gestational_age_checked(d(2024, 1, 1), as_of).unwrap();
        assert_eq!(age, GestationalAge { weeks: 0, days: 1 });
    }

    #[test]
    fn test_total_days_matches_ceil_for_a_range_of_dates() {
        let lmp = d(2023, 11, 20);
        for offset in 0..300 {
            let as_of = lmp + Duration::days(offset);
            let age = gestational_age_on(lmp, as_of);
            assert_eq!(age.total_days() as i64, offset);
            assert!(age.days <= 6);
        }
    }

    #[test]
    fn test_estimated_due_date() {
        assert_eq!(estimated_due_date(d(2024, 1, 1)), d(2024, 10, 7));
    }

    #[test]
    fn test_days_until_goes_negative_after_due() {
        assert_eq!(days_until(d(2024, 10, 7), d(2024, 10, 1)), 6);
        assert_eq!(days_until(d(2024, 10, 7), d(2024, 10, 9)), -2);
    }

    #[test]
    fn test_trimester_boundaries() {
        assert_eq!(GestationalAge { weeks: 12, days: 6 }.trimester(), 1);
        assert_eq!(GestationalAge { weeks: 13, days: 0 }.trimester(), 2);
        assert_eq!(GestationalAge { weeks: 26, days: 6 }.trimester(), 2);
        assert_eq!(GestationalAge { weeks: 27, days: 0 }.trimester(), 3);
    }

    #[test]
    fn test_display_uses_plus_notation() {
        assert_eq!(GestationalAge { weeks: 20, days: 4 }.to_string(), "20+4");
    }
}
