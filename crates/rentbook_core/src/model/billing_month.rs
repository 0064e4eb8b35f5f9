//! Billing-month status rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Open/closed state of one billing month.
///
/// A month without a stored row is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingMonth {
    pub billing_month: NaiveDate,
    pub is_closed: bool,
    /// Unix epoch milliseconds; set exactly when `is_closed`.
    pub closed_at: Option<i64>,
}

impl BillingMonth {
    /// Status of a month that has never been closed.
    pub fn open(billing_month: NaiveDate) -> Self {
        Self {
            billing_month,
            is_closed: false,
            closed_at: None,
        }
    }
}
