//! Dashboard summary for the current billing month.

use crate::locale::month_label;
use crate::model::period::{current_billing_month, prev_month};
use crate::model::settings::Settings;
use crate::repo::bill_repo::{BillListQuery, BillRepository};
use crate::repo::month_repo::MonthRepository;
use crate::repo::settings_repo::SettingsRepository;
use crate::repo::utility_type_repo::UtilityTypeRepository;
use crate::repo::RepoResult;
use crate::service::expected_service::{count_missing, expected_rows};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub today: NaiveDate,
    pub current_billing_month: NaiveDate,
    pub current_billing_month_label: String,
    /// Rent settled together with the current billing month.
    pub rent_month: NaiveDate,
    pub rent_month_label: String,
    pub bills_in_current_month: usize,
    pub current_month_utility_total: Decimal,
    pub is_current_closed: bool,
    /// Expected bills of the active year that have not arrived yet.
    pub missing_count: usize,
    pub settings: Settings,
}

pub struct DashboardService<R> {
    repo: R,
}

impl<R> DashboardService<R>
where
    R: BillRepository + MonthRepository + SettingsRepository + UtilityTypeRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn summary(&self, today: NaiveDate) -> RepoResult<DashboardSummary> {
        let settings = self.repo.get_settings()?;
        let current = current_billing_month(today, settings.billing_day);
        let rent_month = prev_month(current);

        let bills = self.repo.list_bills(&BillListQuery {
            billing_month: Some(current),
        })?;
        let missing_count = count_missing(&expected_rows(&self.repo, settings.active_year)?);

        Ok(DashboardSummary {
            today,
            current_billing_month: current,
            current_billing_month_label: month_label(current),
            rent_month,
            rent_month_label: month_label(rent_month),
            bills_in_current_month: bills.len(),
            current_month_utility_total: bills.iter().map(|bill| bill.amount).sum(),
            is_current_closed: self.repo.is_month_closed(current)?,
            missing_count,
            settings,
        })
    }
}
