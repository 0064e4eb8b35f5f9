//! Settings and utility type use-case service.
//!
//! # Invariants
//! - Rent is non-negative with two decimals.
//! - Billing day stays within 1..=28 so the cutoff exists in every month.
//! - Utility codes are normalized before uniqueness is checked.

use crate::model::bill::parse_money_input;
use crate::model::period::MAX_BILLING_DAY;
use crate::model::settings::Settings;
use crate::model::utility_type::{normalize_code, UtilityType, UtilityTypeId};
use crate::repo::settings_repo::SettingsRepository;
use crate::repo::utility_type_repo::UtilityTypeRepository;
use crate::repo::{RepoError, RepoResult};
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;

pub const ACTIVE_YEAR_RANGE: RangeInclusive<i32> = 2000..=2100;

/// Raw settings form input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDraft {
    pub rent_amount: String,
    pub billing_day: u32,
    pub active_year: i32,
}

#[derive(Debug)]
pub enum SettingsServiceError {
    InvalidRentAmount(String),
    NegativeRentAmount(Decimal),
    InvalidBillingDay(u32),
    InvalidActiveYear(i32),
    EmptyUtilityCode,
    EmptyUtilityName,
    DuplicateUtilityCode(String),
    UtilityTypeNotFound(UtilityTypeId),
    Repo(RepoError),
}

impl Display for SettingsServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRentAmount(raw) => write!(f, "invalid rent amount `{raw}`"),
            Self::NegativeRentAmount(value) => {
                write!(f, "rent amount must not be negative, got {value}")
            }
            Self::InvalidBillingDay(day) => {
                write!(f, "billing day must be between 1 and {MAX_BILLING_DAY}, got {day}")
            }
            Self::InvalidActiveYear(year) => write!(
                f,
                "active year must be between {} and {}, got {year}",
                ACTIVE_YEAR_RANGE.start(),
                ACTIVE_YEAR_RANGE.end()
            ),
            Self::EmptyUtilityCode => write!(f, "utility code must not be blank"),
            Self::EmptyUtilityName => write!(f, "utility name must not be blank"),
            Self::DuplicateUtilityCode(code) => write!(f, "utility code `{code}` already exists"),
            Self::UtilityTypeNotFound(id) => write!(f, "utility type not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SettingsServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SettingsServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Duplicate { key, .. } => Self::DuplicateUtilityCode(key),
            other => Self::Repo(other),
        }
    }
}

pub struct SettingsService<R> {
    repo: R,
}

impl<R> SettingsService<R>
where
    R: SettingsRepository + UtilityTypeRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn get_settings(&self) -> RepoResult<Settings> {
        self.repo.get_settings()
    }

    /// Validates and stores settings; bills already saved keep their month.
    pub fn save_settings(&self, draft: &SettingsDraft) -> Result<Settings, SettingsServiceError> {
        let rent_amount = parse_money_input(&draft.rent_amount)
            .ok_or_else(|| SettingsServiceError::InvalidRentAmount(draft.rent_amount.clone()))?;
        if rent_amount < Decimal::ZERO {
            return Err(SettingsServiceError::NegativeRentAmount(rent_amount));
        }
        if !(1..=MAX_BILLING_DAY).contains(&draft.billing_day) {
            return Err(SettingsServiceError::InvalidBillingDay(draft.billing_day));
        }
        if !ACTIVE_YEAR_RANGE.contains(&draft.active_year) {
            return Err(SettingsServiceError::InvalidActiveYear(draft.active_year));
        }

        let settings = Settings {
            rent_amount,
            billing_day: draft.billing_day,
            active_year: draft.active_year,
        };
        self.repo.save_settings(&settings)?;
        info!(
            "event=settings_save module=service status=ok billing_day={} active_year={}",
            settings.billing_day, settings.active_year
        );
        Ok(settings)
    }

    pub fn list_utility_types(&self, include_inactive: bool) -> RepoResult<Vec<UtilityType>> {
        self.repo.list_utility_types(include_inactive)
    }

    pub fn add_utility_type(
        &self,
        code: &str,
        name: &str,
    ) -> Result<UtilityType, SettingsServiceError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(SettingsServiceError::EmptyUtilityCode);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(SettingsServiceError::EmptyUtilityName);
        }

        let created = self.repo.create_utility_type(&code, name)?;
        info!("event=utility_type_add module=service status=ok code={code}");
        Ok(created)
    }

    pub fn deactivate_utility_type(&self, id: UtilityTypeId) -> Result<(), SettingsServiceError> {
        self.set_active(id, false)
    }

    pub fn activate_utility_type(&self, id: UtilityTypeId) -> Result<(), SettingsServiceError> {
        self.set_active(id, true)
    }

    fn set_active(&self, id: UtilityTypeId, is_active: bool) -> Result<(), SettingsServiceError> {
        match self.repo.set_utility_type_active(id, is_active) {
            Ok(()) => Ok(()),
            Err(RepoError::NotFound { .. }) => Err(SettingsServiceError::UtilityTypeNotFound(id)),
            Err(other) => Err(other.into()),
        }
    }
}
