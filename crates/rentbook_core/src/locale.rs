//! Croatian display labels for months, dates and money.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

pub const HR_MONTHS: [&str; 12] = [
    "siječanj",
    "veljača",
    "ožujak",
    "travanj",
    "svibanj",
    "lipanj",
    "srpanj",
    "kolovoz",
    "rujan",
    "listopad",
    "studeni",
    "prosinac",
];

/// Month name for a 1-based month number, or `None` outside 1..=12.
pub fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    HR_MONTHS.get(index).copied()
}

/// `"{month name}-{year}"`, e.g. `ožujak-2024`.
pub fn month_label(value: NaiveDate) -> String {
    let name = month_name(value.month()).unwrap_or_default();
    format!("{name}-{}", value.year())
}

/// `DD.MM.YYYY`, or an empty string for a missing date.
pub fn format_date(value: Option<NaiveDate>) -> String {
    value
        .map(|date| date.format("%d.%m.%Y").to_string())
        .unwrap_or_default()
}

/// Two decimals with a decimal comma; `0,00` for a missing amount.
pub fn format_money(value: Option<Decimal>) -> String {
    let amount = value.unwrap_or(Decimal::ZERO).round_dp(2);
    format!("{amount:.2}").replace('.', ",")
}
