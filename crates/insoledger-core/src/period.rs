//! Maps transaction dates to zero-based period offsets of a plan.
//!
//! Pure and total over the validity domain: out-of-range dates are reported
//! to the caller, never clamped into the window.

use chrono::{Datelike, Duration, NaiveDate};
use thiserror::Error;

use insoledger_domain::{PeriodType, PlanConfig};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PeriodRangeError {
    #[error("date {0} precedes the plan start")]
    BeforeStart(NaiveDate),
    #[error("date {0} falls beyond the plan window")]
    BeyondEnd(NaiveDate),
}

/// Zero-based period offset of `date` relative to the plan start. Weekly
/// plans count elapsed days in blocks of seven; monthly plans use the
/// calendar-month difference to respect variable month lengths.
pub fn period_offset(plan: &PlanConfig, date: NaiveDate) -> Result<u32, PeriodRangeError> {
    if date < plan.start_date {
        return Err(PeriodRangeError::BeforeStart(date));
    }
    let offset = match plan.period_type {
        PeriodType::Weekly => ((date - plan.start_date).num_days() / 7) as u32,
        PeriodType::Monthly => (month_index(date) - month_index(plan.start_date)) as u32,
    };
    if offset >= plan.period_count {
        return Err(PeriodRangeError::BeyondEnd(date));
    }
    Ok(offset)
}

/// First calendar date of the given period.
pub fn period_start_date(plan: &PlanConfig, period_index: u32) -> NaiveDate {
    match plan.period_type {
        PeriodType::Weekly => plan.start_date + Duration::weeks(period_index as i64),
        PeriodType::Monthly => shift_month(plan.start_date, period_index as i32),
    }
}

pub fn contains_date(plan: &PlanConfig, date: NaiveDate) -> bool {
    period_offset(plan, date).is_ok()
}

fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

pub(crate) fn shift_month(date: NaiveDate, months: i32) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month() as i32 + months;
    while month > 12 {
        month -= 12;
        year += 1;
    }
    while month < 1 {
        month += 12;
        year -= 1;
    }
    let day = date.day().min(days_in_month(year, month as u32));
    NaiveDate::from_ymd_opt(year, month as u32, day).unwrap()
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 28).unwrap());
    (first_next - Duration::days(1)).day()
}
