//! Bill use-case service.
//!
//! # Responsibility
//! - Turn raw form input into validated bills.
//! - Derive each bill's billing month from the configured billing day.
//! - Surface the repository's closed-month guard as `MonthClosed`.
//!
//! # Invariants
//! - Only active utility types accept new or edited bills.
//! - A received date in the future is rejected.
//! - Saving a bill always leaves it unpaid; payment happens by closing its month.
//! - Bills in a closed month cannot be created, edited, moved or deleted.
//! - Draft validation runs before the closed-month guard.

use crate::model::bill::{parse_money_input, Bill, BillId};
use crate::model::period::{compute_billing_month, parse_day_input, parse_month_input};
use crate::repo::bill_repo::{BillListQuery, BillRepository};
use crate::repo::month_repo::MonthRepository;
use crate::repo::settings_repo::SettingsRepository;
use crate::repo::utility_type_repo::UtilityTypeRepository;
use crate::repo::RepoError;
use crate::service::{display_name, utility_names};
use chrono::NaiveDate;
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Raw bill form input, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillDraft {
    pub utility_type: String,
    /// Any shape accepted by `parse_month_input`.
    pub consumption_month: String,
    /// Any shape accepted by `parse_day_input`.
    pub received_date: String,
    /// Decimal point or decimal comma.
    pub amount: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Bill enriched with display data for list/detail views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillRecord {
    #[serde(flatten)]
    pub bill: Bill,
    pub utility_name: String,
    /// Whether the bill's billing month is closed (bill is locked).
    pub month_closed: bool,
}

/// Errors from bill use-cases.
#[derive(Debug)]
pub enum BillServiceError {
    /// Code is unknown or the type was deactivated.
    UnknownUtilityType(String),
    InvalidConsumptionMonth(String),
    InvalidReceivedDate(String),
    ReceivedInFuture(NaiveDate),
    InvalidAmount(String),
    NonPositiveAmount(Decimal),
    /// Target or current billing month is closed.
    MonthClosed(NaiveDate),
    BillNotFound(BillId),
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for BillServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUtilityType(code) => {
                write!(f, "utility type `{code}` is unknown or no longer active")
            }
            Self::InvalidConsumptionMonth(raw) => {
                write!(f, "invalid consumption month `{raw}`")
            }
            Self::InvalidReceivedDate(raw) => write!(f, "invalid received date `{raw}`"),
            Self::ReceivedInFuture(date) => {
                write!(f, "received date {date} must not be in the future")
            }
            Self::InvalidAmount(raw) => write!(f, "invalid amount `{raw}`"),
            Self::NonPositiveAmount(amount) => write!(f, "amount must be positive, got {amount}"),
            Self::MonthClosed(month) => {
                write!(f, "billing month {month} is closed; reopen it first")
            }
            Self::BillNotFound(id) => write!(f, "bill not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent bill state: {details}"),
        }
    }
}

impl Error for BillServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BillServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::MonthClosed(month) => Self::MonthClosed(month),
            other => Self::Repo(other),
        }
    }
}

/// Bill service facade over repository implementations.
pub struct BillService<R> {
    repo: R,
}

impl<R> BillService<R>
where
    R: BillRepository + MonthRepository + SettingsRepository + UtilityTypeRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists every bill, newest received first.
    pub fn list_bills(&self) -> Result<Vec<BillRecord>, BillServiceError> {
        let bills = self.repo.list_bills(&BillListQuery::default())?;
        let names = utility_names(&self.repo)?;
        let closed: HashSet<NaiveDate> = self
            .repo
            .list_months()?
            .into_iter()
            .filter(|summary| summary.status.is_closed)
            .map(|summary| summary.status.billing_month)
            .collect();

        Ok(bills
            .into_iter()
            .map(|bill| BillRecord {
                utility_name: display_name(&names, &bill.utility_type),
                month_closed: closed.contains(&bill.billing_month),
                bill,
            })
            .collect())
    }

    pub fn get_bill(&self, id: BillId) -> Result<BillRecord, BillServiceError> {
        let bill = self
            .repo
            .get_bill(id)?
            .ok_or(BillServiceError::BillNotFound(id))?;
        self.to_record(bill)
    }

    /// Creates an unpaid bill from raw input.
    pub fn create_bill(
        &self,
        draft: &BillDraft,
        today: NaiveDate,
    ) -> Result<BillRecord, BillServiceError> {
        let bill = self.prepare(draft, today)?;
        let id = self.repo.create_bill(&bill)?;
        info!(
            "event=bill_create module=service status=ok bill_id={id} billing_month={}",
            bill.billing_month
        );
        self.read_back(id, "created bill not found in read-back")
    }

    /// Replaces every user-editable field of an existing bill.
    pub fn update_bill(
        &self,
        id: BillId,
        draft: &BillDraft,
        today: NaiveDate,
    ) -> Result<BillRecord, BillServiceError> {
        let existing = self
            .repo
            .get_bill(id)?
            .ok_or(BillServiceError::BillNotFound(id))?;

        let mut bill = self.prepare(draft, today)?;
        bill.id = Some(id);
        bill.created_at = existing.created_at;
        self.repo.update_bill(&bill)?;
        info!(
            "event=bill_update module=service status=ok bill_id={id} billing_month={}",
            bill.billing_month
        );
        self.read_back(id, "updated bill not found in read-back")
    }

    pub fn delete_bill(&self, id: BillId) -> Result<(), BillServiceError> {
        if self.repo.get_bill(id)?.is_none() {
            return Err(BillServiceError::BillNotFound(id));
        }

        self.repo.delete_bill(id)?;
        info!("event=bill_delete module=service status=ok bill_id={id}");
        Ok(())
    }

    fn prepare(&self, draft: &BillDraft, today: NaiveDate) -> Result<Bill, BillServiceError> {
        let code = draft.utility_type.trim();
        let utility = self
            .repo
            .find_utility_type_by_code(code)?
            .filter(|utility| utility.is_active)
            .ok_or_else(|| BillServiceError::UnknownUtilityType(code.to_string()))?;

        let consumption_month = parse_month_input(&draft.consumption_month).ok_or_else(|| {
            BillServiceError::InvalidConsumptionMonth(draft.consumption_month.clone())
        })?;

        let received_date = parse_day_input(&draft.received_date)
            .ok_or_else(|| BillServiceError::InvalidReceivedDate(draft.received_date.clone()))?;
        if received_date > today {
            return Err(BillServiceError::ReceivedInFuture(received_date));
        }

        let amount = parse_money_input(&draft.amount)
            .ok_or_else(|| BillServiceError::InvalidAmount(draft.amount.clone()))?;
        if amount <= Decimal::ZERO {
            return Err(BillServiceError::NonPositiveAmount(amount));
        }

        let settings = self.repo.get_settings()?;
        let billing_month = compute_billing_month(received_date, settings.billing_day);

        let mut bill = Bill::new(
            utility.code,
            consumption_month,
            received_date,
            amount,
            billing_month,
        );
        bill.note = draft
            .note
            .as_deref()
            .map(str::trim)
            .filter(|note| !note.is_empty())
            .map(str::to_string);
        Ok(bill)
    }

    fn read_back(&self, id: BillId, details: &'static str) -> Result<BillRecord, BillServiceError> {
        let bill = self
            .repo
            .get_bill(id)?
            .ok_or(BillServiceError::InconsistentState(details))?;
        self.to_record(bill)
    }

    fn to_record(&self, bill: Bill) -> Result<BillRecord, BillServiceError> {
        let names = utility_names(&self.repo)?;
        Ok(BillRecord {
            utility_name: display_name(&names, &bill.utility_type),
            month_closed: self.repo.is_month_closed(bill.billing_month)?,
            bill,
        })
    }
}
