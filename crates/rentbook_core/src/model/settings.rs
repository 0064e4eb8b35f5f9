//! Application settings singleton.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rent and billing-period configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Monthly rent, paid together with the next billing month.
    pub rent_amount: Decimal,
    /// Last day of a month whose bills still belong to that month (1..=28).
    pub billing_day: u32,
    /// Year shown by the expected-bills grid and dashboard.
    pub active_year: i32,
}
