//! Billing-month status repository and close/reopen transactions.
//!
//! # Responsibility
//! - Read and list billing-month status rows.
//! - Close or reopen a month together with the paid state of its bills.
//!
//! # Invariants
//! - Close/reopen run in one IMMEDIATE transaction; the status row and every
//!   bill of the month change together or not at all.
//! - Months referenced by bills but lacking a status row are reported open.

use crate::model::billing_month::BillingMonth;
use crate::repo::{int_to_bool, RepoResult, SqliteRepository};
use chrono::NaiveDate;
use log::info;
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};

/// One row of the month overview list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthSummary {
    pub status: BillingMonth,
    pub bill_count: i64,
}

/// Repository interface for billing-month status.
pub trait MonthRepository {
    fn get_month(&self, month: NaiveDate) -> RepoResult<Option<BillingMonth>>;
    /// Lists every month known from bills or status rows, newest first.
    fn list_months(&self) -> RepoResult<Vec<MonthSummary>>;
    /// Closes `month` and marks its bills paid on `paid_date`.
    ///
    /// Returns the number of bills in the month.
    fn close_month(&self, month: NaiveDate, paid_date: NaiveDate) -> RepoResult<usize>;
    /// Reopens `month` and marks its bills unpaid.
    ///
    /// Returns the number of bills in the month.
    fn reopen_month(&self, month: NaiveDate) -> RepoResult<usize>;

    fn is_month_closed(&self, month: NaiveDate) -> RepoResult<bool> {
        Ok(self
            .get_month(month)?
            .map(|status| status.is_closed)
            .unwrap_or(false))
    }
}

impl MonthRepository for SqliteRepository<'_> {
    fn get_month(&self, month: NaiveDate) -> RepoResult<Option<BillingMonth>> {
        let row = self
            .conn
            .query_row(
                "SELECT billing_month, is_closed, closed_at
                 FROM billing_months
                 WHERE billing_month = ?1;",
                [month],
                |row| {
                    Ok((
                        row.get::<_, NaiveDate>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((billing_month, is_closed, closed_at)) => Ok(Some(BillingMonth {
                billing_month,
                is_closed: int_to_bool(is_closed, "billing_months.is_closed")?,
                closed_at,
            })),
            None => Ok(None),
        }
    }

    fn list_months(&self) -> RepoResult<Vec<MonthSummary>> {
        let mut stmt = self.conn.prepare(
            "WITH months AS (
                SELECT billing_month FROM bills
                UNION
                SELECT billing_month FROM billing_months
             )
             SELECT
                m.billing_month AS billing_month,
                COALESCE(bm.is_closed, 0) AS is_closed,
                bm.closed_at AS closed_at,
                (SELECT COUNT(*) FROM bills b WHERE b.billing_month = m.billing_month) AS bill_count
             FROM months m
             LEFT JOIN billing_months bm ON bm.billing_month = m.billing_month
             ORDER BY m.billing_month DESC;",
        )?;

        let mut rows = stmt.query([])?;
        let mut months = Vec::new();
        while let Some(row) = rows.next()? {
            months.push(MonthSummary {
                status: BillingMonth {
                    billing_month: row.get("billing_month")?,
                    is_closed: int_to_bool(row.get("is_closed")?, "billing_months.is_closed")?,
                    closed_at: row.get("closed_at")?,
                },
                bill_count: row.get("bill_count")?,
            });
        }
        Ok(months)
    }

    fn close_month(&self, month: NaiveDate, paid_date: NaiveDate) -> RepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO billing_months (billing_month, is_closed, closed_at)
             VALUES (?1, 1, (strftime('%s', 'now') * 1000))
             ON CONFLICT (billing_month) DO UPDATE SET
                is_closed = 1,
                closed_at = excluded.closed_at;",
            [month],
        )?;
        let bills = tx.execute(
            "UPDATE bills
             SET is_paid = 1, paid_date = ?2
             WHERE billing_month = ?1;",
            params![month, paid_date],
        )?;
        tx.commit()?;

        info!("event=month_close module=repo status=ok month={month} bills={bills}");
        Ok(bills)
    }

    fn reopen_month(&self, month: NaiveDate) -> RepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO billing_months (billing_month, is_closed, closed_at)
             VALUES (?1, 0, NULL)
             ON CONFLICT (billing_month) DO UPDATE SET
                is_closed = 0,
                closed_at = NULL;",
            [month],
        )?;
        let bills = tx.execute(
            "UPDATE bills
             SET is_paid = 0, paid_date = NULL
             WHERE billing_month = ?1;",
            [month],
        )?;
        tx.commit()?;

        info!("event=month_reopen module=repo status=ok month={month} bills={bills}");
        Ok(bills)
    }
}
