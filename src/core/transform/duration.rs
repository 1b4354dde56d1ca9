//! Wound duration helper

use crate::domain::profile::DurationUnit;
use chrono::NaiveDate;
use serde::Serialize;

/// Elapsed time since a wound start date, bucketed
///
/// Weeks, months and years are floor divisions of days by 7, 30 and 365.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WoundDuration {
    pub days: i64,
    pub weeks: i64,
    pub months: i64,
    pub years: i64,
}

impl WoundDuration {
    /// Duration from `start` to `today`; a future start is all zeros
    ///
    /// # Examples
    ///
    /// ```
    /// use ivr_mapper::core::transform::duration::WoundDuration;
    /// use chrono::NaiveDate;
    ///
    /// let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    /// let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    /// let duration = WoundDuration::between(start, today);
    /// assert_eq!(duration.days, 59);
    /// assert_eq!(duration.weeks, 8);
    /// assert_eq!(duration.months, 1);
    /// ```
    pub fn between(start: NaiveDate, today: NaiveDate) -> Self {
        let days = (today - start).num_days();
        if days < 0 {
            return Self::default();
        }
        Self {
            days,
            weeks: days / 7,
            months: days / 30,
            years: days / 365,
        }
    }

    /// Like [`WoundDuration::between`] for an optional start date
    pub fn since(start: Option<NaiveDate>, today: NaiveDate) -> Self {
        start
            .map(|start| Self::between(start, today))
            .unwrap_or_default()
    }

    /// Value of one bucket
    pub fn in_unit(&self, unit: DurationUnit) -> i64 {
        match unit {
            DurationUnit::Days => self.days,
            DurationUnit::Weeks => self.weeks,
            DurationUnit::Months => self.months,
            DurationUnit::Years => self.years,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.days == 0
    }
}
