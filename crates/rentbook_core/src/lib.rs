//! Core domain logic for rentbook.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod locale;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::bill::{parse_money_input, Bill, BillId, BillValidationError};
pub use model::billing_month::BillingMonth;
pub use model::period::{
    compute_billing_month, current_billing_month, parse_day_input, parse_month_input,
};
pub use model::settings::Settings;
pub use model::utility_type::{UtilityType, UtilityTypeId};
pub use repo::bill_repo::{BillListQuery, BillRepository};
pub use repo::month_repo::{MonthRepository, MonthSummary};
pub use repo::settings_repo::SettingsRepository;
pub use repo::utility_type_repo::UtilityTypeRepository;
pub use repo::{RepoError, RepoResult, SqliteRepository};
pub use service::bill_service::{BillDraft, BillRecord, BillService, BillServiceError};
pub use service::dashboard_service::{DashboardService, DashboardSummary};
pub use service::expected_service::{
    ExpectedBillGrid, ExpectedBillRow, ExpectedBillService, ExpectedBillServiceError,
};
pub use service::month_service::{
    MonthOverview, MonthService, MonthServiceError, MonthlySettlement, UtilityTotal,
};
pub use service::settings_service::{SettingsDraft, SettingsService, SettingsServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
