use chrono::{DateTime, Duration, Months, Utc};

use crate::errors::{LedgerError, Result};
use crate::types::Plan;

/// days in one weekly period
pub const DAYS_PER_WEEK: i64 = 7;

/// advance `anchor` by `periods` whole billing periods
///
/// monthly periods keep the anchor's day of month and clamp to the last
/// valid day when the target month is shorter (jan 31 + 1 month = feb 28/29).
/// the offset is always taken from the anchor in one step, so a clamp in one
/// month never shortens later periods.
pub fn add_periods(anchor: DateTime<Utc>, plan: Plan, periods: u32) -> Result<DateTime<Utc>> {
    let shifted = match plan {
        Plan::Weekly => {
            anchor.checked_add_signed(Duration::days(DAYS_PER_WEEK * i64::from(periods)))
        }
        Plan::Monthly => anchor.checked_add_months(Months::new(periods)),
    };

    shifted.ok_or_else(|| LedgerError::InvalidDate {
        message: format!("{} + {} {} periods is out of range", anchor, periods, plan),
    })
}

/// whole days from `from` to `to`, negative when `to` is earlier
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to.date_naive() - from.date_naive()).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_weekly_periods() {
        let anchor = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(
            add_periods(anchor, Plan::Weekly, 2).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()
        );
        assert_eq!(add_periods(anchor, Plan::Weekly, 0).unwrap(), anchor);
    }

    #[test]
    fn test_monthly_clamps_to_month_end() {
        let jan_31_leap = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(
            add_periods(jan_31_leap, Plan::Monthly, 1).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
        );

        let jan_31 = Utc.with_ymd_and_hms(2023, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(
            add_periods(jan_31, Plan::Monthly, 1).unwrap(),
            Utc.with_ymd_and_hms(2023, 2, 28, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_monthly_offset_taken_from_anchor() {
        // a february clamp must not drag march back to the 28th
        let jan_31 = Utc.with_ymd_and_hms(2023, 1, 31, 0, 0, 0).unwrap();
        assert_eq!(
            add_periods(jan_31, Plan::Monthly, 2).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 31, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_days_between() {
        let a = Utc.with_ymd_and_hms(2024, 5, 1, 23, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 5, 3, 1, 0, 0).unwrap();
        assert_eq!(days_between(a, b), 2);
        assert_eq!(days_between(b, a), -2);
    }
}
