//! Utility bill domain model.
//!
//! # Responsibility
//! - Define the canonical bill record stored in `bills`.
//! - Validate record-level invariants before persistence.
//!
//! # Invariants
//! - `consumption_month` and `billing_month` are always the 1st of a month.
//! - `amount` is strictly positive with at most two decimal places.
//! - `paid_date` is set exactly when `is_paid` is true.

use crate::model::period::is_month_start;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Database row id of a bill.
pub type BillId = i64;

/// Money values carry at most this many fractional digits.
pub const MONEY_SCALE: u32 = 2;

/// One received utility bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    /// `None` until the row is inserted.
    pub id: Option<BillId>,
    /// Code of the utility type, e.g. `electricity`.
    pub utility_type: String,
    /// Month the consumption happened in.
    pub consumption_month: NaiveDate,
    pub received_date: NaiveDate,
    pub amount: Decimal,
    /// Settlement period derived from `received_date` and the billing day.
    pub billing_month: NaiveDate,
    pub is_paid: bool,
    pub paid_date: Option<NaiveDate>,
    pub note: Option<String>,
    /// Unix epoch milliseconds; assigned by storage on insert.
    pub created_at: Option<i64>,
}

/// Record-level validation failures for [`Bill`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillValidationError {
    EmptyUtilityType,
    ConsumptionMonthNotMonthStart(NaiveDate),
    BillingMonthNotMonthStart(NaiveDate),
    NonPositiveAmount(Decimal),
    AmountScale(Decimal),
    PaidDateMismatch,
}

impl Display for BillValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUtilityType => write!(f, "utility_type must not be empty"),
            Self::ConsumptionMonthNotMonthStart(value) => {
                write!(f, "consumption_month must be the first day of a month, got {value}")
            }
            Self::BillingMonthNotMonthStart(value) => {
                write!(f, "billing_month must be the first day of a month, got {value}")
            }
            Self::NonPositiveAmount(value) => write!(f, "amount must be positive, got {value}"),
            Self::AmountScale(value) => {
                write!(f, "amount must have at most {MONEY_SCALE} decimals, got {value}")
            }
            Self::PaidDateMismatch => write!(f, "paid_date must be set exactly when is_paid"),
        }
    }
}

impl Error for BillValidationError {}

/// Parses user-entered money, accepting a decimal comma (`12,50`).
///
/// The result is rounded half-to-even to [`MONEY_SCALE`] decimals.
pub fn parse_money_input(raw: &str) -> Option<Decimal> {
    let normalized = raw.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized)
        .ok()
        .map(|value| value.round_dp(MONEY_SCALE))
}

impl Bill {
    /// Creates an unpaid, not yet persisted bill.
    pub fn new(
        utility_type: impl Into<String>,
        consumption_month: NaiveDate,
        received_date: NaiveDate,
        amount: Decimal,
        billing_month: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            utility_type: utility_type.into(),
            consumption_month,
            received_date,
            amount,
            billing_month,
            is_paid: false,
            paid_date: None,
            note: None,
            created_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), BillValidationError> {
        if self.utility_type.trim().is_empty() {
            return Err(BillValidationError::EmptyUtilityType);
        }
        if !is_month_start(self.consumption_month) {
            return Err(BillValidationError::ConsumptionMonthNotMonthStart(
                self.consumption_month,
            ));
        }
        if !is_month_start(self.billing_month) {
            return Err(BillValidationError::BillingMonthNotMonthStart(
                self.billing_month,
            ));
        }
        if self.amount <= Decimal::ZERO {
            return Err(BillValidationError::NonPositiveAmount(self.amount));
        }
        if self.amount.normalize().scale() > MONEY_SCALE {
            return Err(BillValidationError::AmountScale(self.amount));
        }
        if self.is_paid != self.paid_date.is_some() {
            return Err(BillValidationError::PaidDateMismatch);
        }
        Ok(())
    }

    pub fn mark_paid(&mut self, paid_date: NaiveDate) {
        self.is_paid = true;
        self.paid_date = Some(paid_date);
    }

    pub fn mark_unpaid(&mut self) {
        self.is_paid = false;
        self.paid_date = None;
    }
}
