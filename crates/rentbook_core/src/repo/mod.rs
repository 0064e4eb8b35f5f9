//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts, one trait per table.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Bill writes must enforce `Bill::validate()` before persistence.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repository APIs return semantic errors (`NotFound`, `Duplicate`,
//!   `MonthClosed`) in addition to DB transport errors.
//! - Bill writes check the closed-month guard inside the same IMMEDIATE
//!   transaction as the write.

use crate::db::DbError;
use crate::model::bill::BillValidationError;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod bill_repo;
pub mod month_repo;
pub mod settings_repo;
pub mod utility_type_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(BillValidationError),
    Db(DbError),
    NotFound { entity: &'static str, key: String },
    /// Unique constraint hit; carries the conflicting key.
    Duplicate { entity: &'static str, key: String },
    /// Write refused because the billing month is closed.
    MonthClosed(NaiveDate),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Duplicate { entity, key } => write!(f, "{entity} already exists: {key}"),
            Self::MonthClosed(month) => {
                write!(f, "billing month {month} is closed; reopen it first")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. }
            | Self::Duplicate { .. }
            | Self::MonthClosed(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<BillValidationError> for RepoError {
    fn from(value: BillValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// SQLite-backed implementation of every repository trait.
#[derive(Clone, Copy)]
pub struct SqliteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_decimal(value: &str, column: &str) -> RepoResult<Decimal> {
    Decimal::from_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid decimal `{value}` in {column}")))
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Whether `month` has a status row marked closed.
pub(crate) fn month_is_closed(conn: &Connection, month: NaiveDate) -> RepoResult<bool> {
    let is_closed = conn
        .query_row(
            "SELECT is_closed FROM billing_months WHERE billing_month = ?1;",
            [month],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    match is_closed {
        Some(value) => int_to_bool(value, "billing_months.is_closed"),
        None => Ok(false),
    }
}
