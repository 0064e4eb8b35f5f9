//! Calendar-month arithmetic and the billing-day cutoff rule.
//!
//! # Invariants
//! - Every month value handled by core is a `NaiveDate` on day 1.
//! - A bill received on or before the billing day belongs to the month it was
//!   received in; later bills roll into the following month.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Highest configurable billing day; keeps the cutoff valid in February.
pub const MAX_BILLING_DAY: u32 = 28;

static YEAR_FIRST_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").expect("valid year-month regex"));
static MONTH_FIRST_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/.\-](\d{4})$").expect("valid month-year regex"));

const DAY_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d.%m.%Y."];

pub fn first_of_month(value: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month.
    value.with_day(1).unwrap_or(value)
}

pub fn is_month_start(value: NaiveDate) -> bool {
    value.day() == 1
}

pub fn next_month(value: NaiveDate) -> NaiveDate {
    let (year, month) = if value.month() == 12 {
        (value.year() + 1, 1)
    } else {
        (value.year(), value.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(value)
}

pub fn prev_month(value: NaiveDate) -> NaiveDate {
    let (year, month) = if value.month() == 1 {
        (value.year() - 1, 12)
    } else {
        (value.year(), value.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(value)
}

/// Returns the billing month a bill received on `received_date` belongs to.
pub fn compute_billing_month(received_date: NaiveDate, billing_day: u32) -> NaiveDate {
    let month = first_of_month(received_date);
    if received_date.day() <= billing_day {
        month
    } else {
        next_month(month)
    }
}

/// Returns the billing month that is currently accepting bills.
pub fn current_billing_month(today: NaiveDate, billing_day: u32) -> NaiveDate {
    compute_billing_month(today, billing_day)
}

/// Returns the first day of every month of `year`, January first.
pub fn months_of_year(year: i32) -> Vec<NaiveDate> {
    (1..=12)
        .filter_map(|month| NaiveDate::from_ymd_opt(year, month, 1))
        .collect()
}

/// Parses a month in any accepted input shape and normalizes it to day 1.
///
/// Accepted: `YYYY-MM`, `YYYY-MM-DD`, `MM/YYYY`, `MM-YYYY`, `MM.YYYY`.
pub fn parse_month_input(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(first_of_month(date));
    }

    let (year, month) = if let Some(caps) = YEAR_FIRST_MONTH_RE.captures(trimmed) {
        (caps[1].parse::<i32>().ok()?, caps[2].parse::<u32>().ok()?)
    } else if let Some(caps) = MONTH_FIRST_MONTH_RE.captures(trimmed) {
        (caps[2].parse::<i32>().ok()?, caps[1].parse::<u32>().ok()?)
    } else {
        return None;
    };

    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Parses a calendar day (`YYYY-MM-DD`, `DD.MM.YYYY` or `DD.MM.YYYY.`).
pub fn parse_day_input(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DAY_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}
