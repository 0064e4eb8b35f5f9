//! Expected-bills grid: which recurring bills have arrived this year.

use crate::locale::month_label;
use crate::model::period::months_of_year;
use crate::repo::bill_repo::{BillRepository, ConsumptionStats};
use crate::repo::utility_type_repo::UtilityTypeRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::settings_service::ACTIVE_YEAR_RANGE;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One (utility type, consumption month) cell of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectedBillRow {
    pub utility_type: String,
    pub utility_name: String,
    pub consumption_month: NaiveDate,
    pub month_label: String,
    /// At least one bill exists for this type and consumption month.
    pub received: bool,
    pub first_received_date: Option<NaiveDate>,
    /// At least one of those bills is paid.
    pub charged: bool,
}

/// Grid for one year together with its missing-cell count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectedBillGrid {
    pub year: i32,
    pub missing_count: usize,
    pub rows: Vec<ExpectedBillRow>,
}

#[derive(Debug)]
pub enum ExpectedBillServiceError {
    YearOutOfRange(i32),
    Repo(RepoError),
}

impl Display for ExpectedBillServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::YearOutOfRange(year) => write!(
                f,
                "year must be between {} and {}, got {year}",
                ACTIVE_YEAR_RANGE.start(),
                ACTIVE_YEAR_RANGE.end()
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExpectedBillServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::YearOutOfRange(_) => None,
        }
    }
}

impl From<RepoError> for ExpectedBillServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub struct ExpectedBillService<R> {
    repo: R,
}

impl<R> ExpectedBillService<R>
where
    R: BillRepository + UtilityTypeRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Rows for every active type (by name) and every month of `year`.
    pub fn rows(&self, year: i32) -> Result<Vec<ExpectedBillRow>, ExpectedBillServiceError> {
        ensure_year_in_range(year)?;
        Ok(expected_rows(&self.repo, year)?)
    }

    /// Number of grid cells in `year` without any received bill.
    pub fn missing_count(&self, year: i32) -> Result<usize, ExpectedBillServiceError> {
        Ok(count_missing(&self.rows(year)?))
    }

    pub fn grid(&self, year: i32) -> Result<ExpectedBillGrid, ExpectedBillServiceError> {
        let rows = self.rows(year)?;
        Ok(ExpectedBillGrid {
            year,
            missing_count: count_missing(&rows),
            rows,
        })
    }
}

fn ensure_year_in_range(year: i32) -> Result<(), ExpectedBillServiceError> {
    if !ACTIVE_YEAR_RANGE.contains(&year) {
        return Err(ExpectedBillServiceError::YearOutOfRange(year));
    }
    Ok(())
}

pub(crate) fn count_missing(rows: &[ExpectedBillRow]) -> usize {
    rows.iter().filter(|row| !row.received).count()
}

pub(crate) fn expected_rows<R>(repo: &R, year: i32) -> RepoResult<Vec<ExpectedBillRow>>
where
    R: BillRepository + UtilityTypeRepository,
{
    let stats: HashMap<(String, NaiveDate), ConsumptionStats> = repo
        .consumption_stats(year)?
        .into_iter()
        .map(|stat| ((stat.utility_type.clone(), stat.consumption_month), stat))
        .collect();

    let months = months_of_year(year);
    let mut rows = Vec::new();
    for utility in repo.list_utility_types(false)? {
        for month in &months {
            let stat = stats.get(&(utility.code.clone(), *month));
            rows.push(ExpectedBillRow {
                utility_type: utility.code.clone(),
                utility_name: utility.name.clone(),
                consumption_month: *month,
                month_label: month_label(*month),
                received: stat.is_some_and(|stat| stat.bill_count > 0),
                first_received_date: stat.and_then(|stat| stat.first_received_date),
                charged: stat.is_some_and(|stat| stat.paid_count > 0),
            });
        }
    }
    Ok(rows)
}
