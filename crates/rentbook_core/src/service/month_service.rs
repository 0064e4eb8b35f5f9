//! Monthly settlement use-case service.
//!
//! # Responsibility
//! - List billing months with their status and utility totals.
//! - Build the settlement of one month: bills, per-utility totals, rent.
//! - Close and reopen months.
//!
//! # Invariants
//! - Rent shown with billing month M is the rent for month M-1.
//! - `grand_total == total_utility + rent_amount`.
//! - Close/reopen are idempotent.

use crate::locale::month_label;
use crate::model::bill::Bill;
use crate::model::billing_month::BillingMonth;
use crate::model::period::{is_month_start, prev_month};
use crate::repo::bill_repo::{BillListQuery, BillRepository};
use crate::repo::month_repo::MonthRepository;
use crate::repo::settings_repo::SettingsRepository;
use crate::repo::utility_type_repo::UtilityTypeRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::{display_name, utility_names};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One row of the month overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthOverview {
    pub billing_month: NaiveDate,
    pub label: String,
    pub is_closed: bool,
    pub closed_at: Option<i64>,
    pub bill_count: i64,
    pub total_utility: Decimal,
}

/// Sum of one utility's bills within a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UtilityTotal {
    pub utility_type: String,
    pub utility_name: String,
    pub bill_count: usize,
    pub amount: Decimal,
}

/// Rent plus utilities owed for one billing month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySettlement {
    pub billing_month: NaiveDate,
    pub label: String,
    pub year: i32,
    pub month: u32,
    /// Month the rent part of this settlement pays for.
    pub rent_month: NaiveDate,
    pub rent_month_label: String,
    /// Ordered by utility code, then received date.
    pub bills: Vec<Bill>,
    pub utility_totals: Vec<UtilityTotal>,
    pub total_utility: Decimal,
    pub rent_amount: Decimal,
    pub grand_total: Decimal,
    pub is_closed: bool,
    pub closed_at: Option<i64>,
}

#[derive(Debug)]
pub enum MonthServiceError {
    /// Month values must be the first day of a month.
    NotMonthStart(NaiveDate),
    Repo(RepoError),
}

impl Display for MonthServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotMonthStart(value) => {
                write!(f, "billing month must be the first day of a month, got {value}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MonthServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::NotMonthStart(_) => None,
        }
    }
}

impl From<RepoError> for MonthServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub struct MonthService<R> {
    repo: R,
}

impl<R> MonthService<R>
where
    R: BillRepository + MonthRepository + SettingsRepository + UtilityTypeRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists months known from bills or status rows, newest first.
    pub fn list_months(&self) -> RepoResult<Vec<MonthOverview>> {
        let summaries = self.repo.list_months()?;
        let mut overview = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let month = summary.status.billing_month;
            let bills = self.month_bills(month)?;
            overview.push(MonthOverview {
                billing_month: month,
                label: month_label(month),
                is_closed: summary.status.is_closed,
                closed_at: summary.status.closed_at,
                bill_count: summary.bill_count,
                total_utility: sum_amounts(&bills),
            });
        }
        Ok(overview)
    }

    /// Builds the settlement for `month`; months without bills are rent-only.
    pub fn settlement(&self, month: NaiveDate) -> Result<MonthlySettlement, MonthServiceError> {
        ensure_month_start(month)?;

        let settings = self.repo.get_settings()?;
        let names = utility_names(&self.repo)?;
        let status = self
            .repo
            .get_month(month)?
            .unwrap_or_else(|| BillingMonth::open(month));

        let mut bills = self.month_bills(month)?;
        bills.sort_by(|left, right| {
            left.utility_type
                .cmp(&right.utility_type)
                .then(left.received_date.cmp(&right.received_date))
                .then(left.id.cmp(&right.id))
        });

        let mut per_type: BTreeMap<&str, (usize, Decimal)> = BTreeMap::new();
        for bill in &bills {
            let entry = per_type
                .entry(bill.utility_type.as_str())
                .or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += bill.amount;
        }
        let utility_totals = per_type
            .into_iter()
            .map(|(code, (bill_count, amount))| UtilityTotal {
                utility_type: code.to_string(),
                utility_name: display_name(&names, code),
                bill_count,
                amount,
            })
            .collect();

        let total_utility = sum_amounts(&bills);
        let rent_month = prev_month(month);
        Ok(MonthlySettlement {
            billing_month: month,
            label: month_label(month),
            year: month.year(),
            month: month.month(),
            rent_month,
            rent_month_label: month_label(rent_month),
            utility_totals,
            total_utility,
            rent_amount: settings.rent_amount,
            grand_total: total_utility + settings.rent_amount,
            is_closed: status.is_closed,
            closed_at: status.closed_at,
            bills,
        })
    }

    /// Closes `month`, marking every bill in it paid on `today`.
    pub fn close_month(
        &self,
        month: NaiveDate,
        today: NaiveDate,
    ) -> Result<MonthlySettlement, MonthServiceError> {
        ensure_month_start(month)?;
        self.repo.close_month(month, today)?;
        self.settlement(month)
    }

    /// Reopens `month`, marking every bill in it unpaid.
    pub fn reopen_month(&self, month: NaiveDate) -> Result<MonthlySettlement, MonthServiceError> {
        ensure_month_start(month)?;
        self.repo.reopen_month(month)?;
        self.settlement(month)
    }

    fn month_bills(&self, month: NaiveDate) -> RepoResult<Vec<Bill>> {
        self.repo.list_bills(&BillListQuery {
            billing_month: Some(month),
        })
    }
}

fn ensure_month_start(month: NaiveDate) -> Result<(), MonthServiceError> {
    if is_month_start(month) {
        Ok(())
    } else {
        Err(MonthServiceError::NotMonthStart(month))
    }
}

fn sum_amounts(bills: &[Bill]) -> Decimal {
    bills.iter().map(|bill| bill.amount).sum()
}
