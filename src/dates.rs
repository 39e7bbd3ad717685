//! Calendar helpers for due-date scheduling.

use chrono::{Datelike, NaiveDate};

use crate::error::{PlanError, PlanResult};

/// Adds `months` calendar months to `date`, keeping the day of month.
///
/// When the day does not exist in the target month (the 31st into April, the
/// 29th into a non-leap February), the last day of that month is used instead.
/// Returns `None` only if the result falls outside chrono's supported range.
pub fn add_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let zero_based = (date.month0() as i32).checked_add(months)?;
    let year = date.year() + zero_based.div_euclid(12);
    let month = zero_based.rem_euclid(12) as u32 + 1;
    let day = date.day().min(last_day_of_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Number of the last day in the given month, e.g. 29 for February 2024.
pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    first_of_next.pred_opt().map(|d| d.day())
}

/// Whole calendar days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Parses a start date written as `YYYY-MM-DD` or `YYYYMMDD`.
pub fn parse_date(text: &str) -> PlanResult<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y%m%d"))
        .map_err(|_| {
            PlanError::DateError(format!(
                "{text:?} is not a date in YYYY-MM-DD or YYYYMMDD form"
            ))
        })
}
