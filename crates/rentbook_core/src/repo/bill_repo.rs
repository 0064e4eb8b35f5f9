//! Bill repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `bills`.
//! - Provide the per-consumption-month aggregates behind the expected-bills grid.
//!
//! # Invariants
//! - Write paths call `Bill::validate()` before SQL mutations.
//! - Create, update and delete check the closed-month guard inside the same
//!   IMMEDIATE transaction as the write.
//! - Default list order is `received_date DESC, id DESC`.

use crate::model::bill::{Bill, BillId};
use crate::repo::{
    bool_to_int, int_to_bool, month_is_closed, parse_decimal, RepoError, RepoResult,
    SqliteRepository,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};

const BILL_SELECT_SQL: &str = "SELECT
    id,
    utility_type,
    consumption_month,
    received_date,
    amount,
    billing_month,
    is_paid,
    paid_date,
    note,
    created_at
FROM bills";

/// Filters for listing bills.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillListQuery {
    pub billing_month: Option<NaiveDate>,
}

/// Bills received for one utility type and consumption month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionStats {
    pub utility_type: String,
    pub consumption_month: NaiveDate,
    pub bill_count: i64,
    pub first_received_date: Option<NaiveDate>,
    pub paid_count: i64,
}

/// Repository interface for bill operations.
pub trait BillRepository {
    /// Inserts `bill`; `MonthClosed` when its billing month is closed.
    fn create_bill(&self, bill: &Bill) -> RepoResult<BillId>;
    /// Overwrites every column of the bill identified by `bill.id`.
    ///
    /// `MonthClosed` when the stored or the new billing month is closed.
    fn update_bill(&self, bill: &Bill) -> RepoResult<()>;
    fn get_bill(&self, id: BillId) -> RepoResult<Option<Bill>>;
    fn list_bills(&self, query: &BillListQuery) -> RepoResult<Vec<Bill>>;
    /// `MonthClosed` when the bill's billing month is closed.
    fn delete_bill(&self, id: BillId) -> RepoResult<()>;
    /// Aggregates bills whose consumption month falls in `year`.
    fn consumption_stats(&self, year: i32) -> RepoResult<Vec<ConsumptionStats>>;
}

impl BillRepository for SqliteRepository<'_> {
    fn create_bill(&self, bill: &Bill) -> RepoResult<BillId> {
        bill.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_month_open(&tx, bill.billing_month)?;
        tx.execute(
            "INSERT INTO bills (
                utility_type,
                consumption_month,
                received_date,
                amount,
                billing_month,
                is_paid,
                paid_date,
                note
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                bill.utility_type.as_str(),
                bill.consumption_month,
                bill.received_date,
                bill.amount.to_string(),
                bill.billing_month,
                bool_to_int(bill.is_paid),
                bill.paid_date,
                bill.note.as_deref(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(id)
    }

    fn update_bill(&self, bill: &Bill) -> RepoResult<()> {
        let id = bill.id.ok_or_else(|| {
            RepoError::InvalidData("cannot update a bill without id".to_string())
        })?;
        bill.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let stored_month = stored_billing_month(&tx, id)?;
        ensure_month_open(&tx, stored_month)?;
        if bill.billing_month != stored_month {
            ensure_month_open(&tx, bill.billing_month)?;
        }
        tx.execute(
            "UPDATE bills
             SET
                utility_type = ?1,
                consumption_month = ?2,
                received_date = ?3,
                amount = ?4,
                billing_month = ?5,
                is_paid = ?6,
                paid_date = ?7,
                note = ?8
             WHERE id = ?9;",
            params![
                bill.utility_type.as_str(),
                bill.consumption_month,
                bill.received_date,
                bill.amount.to_string(),
                bill.billing_month,
                bool_to_int(bill.is_paid),
                bill.paid_date,
                bill.note.as_deref(),
                id,
            ],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn get_bill(&self, id: BillId) -> RepoResult<Option<Bill>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BILL_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_bill_row(row)?));
        }
        Ok(None)
    }

    fn list_bills(&self, query: &BillListQuery) -> RepoResult<Vec<Bill>> {
        let mut sql = format!("{BILL_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(month) = query.billing_month {
            sql.push_str(" AND billing_month = ?");
            bind_values.push(Value::Text(month.format("%Y-%m-%d").to_string()));
        }
        sql.push_str(" ORDER BY received_date DESC, id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut bills = Vec::new();
        while let Some(row) = rows.next()? {
            bills.push(parse_bill_row(row)?);
        }
        Ok(bills)
    }

    fn delete_bill(&self, id: BillId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let month = stored_billing_month(&tx, id)?;
        ensure_month_open(&tx, month)?;
        tx.execute("DELETE FROM bills WHERE id = ?1;", [id])?;
        tx.commit()?;
        Ok(())
    }

    fn consumption_stats(&self, year: i32) -> RepoResult<Vec<ConsumptionStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                utility_type,
                consumption_month,
                COUNT(*) AS bill_count,
                MIN(received_date) AS first_received_date,
                SUM(CASE WHEN is_paid = 1 THEN 1 ELSE 0 END) AS paid_count
             FROM bills
             WHERE consumption_month >= ?1
               AND consumption_month < ?2
             GROUP BY utility_type, consumption_month
             ORDER BY utility_type ASC, consumption_month ASC;",
        )?;

        let next_year = year
            .checked_add(1)
            .ok_or_else(|| RepoError::InvalidData(format!("year {year} is out of range")))?;
        let mut rows = stmt.query(params![
            format!("{year:04}-01-01"),
            format!("{next_year:04}-01-01")
        ])?;
        let mut stats = Vec::new();
        while let Some(row) = rows.next()? {
            stats.push(ConsumptionStats {
                utility_type: row.get("utility_type")?,
                consumption_month: row.get("consumption_month")?,
                bill_count: row.get("bill_count")?,
                first_received_date: row.get("first_received_date")?,
                paid_count: row.get("paid_count")?,
            });
        }
        Ok(stats)
    }
}

fn parse_bill_row(row: &Row<'_>) -> RepoResult<Bill> {
    let amount_text: String = row.get("amount")?;
    let bill = Bill {
        id: Some(row.get("id")?),
        utility_type: row.get("utility_type")?,
        consumption_month: row.get("consumption_month")?,
        received_date: row.get("received_date")?,
        amount: parse_decimal(&amount_text, "bills.amount")?,
        billing_month: row.get("billing_month")?,
        is_paid: int_to_bool(row.get("is_paid")?, "bills.is_paid")?,
        paid_date: row.get("paid_date")?,
        note: row.get("note")?,
        created_at: Some(row.get("created_at")?),
    };
    bill.validate()?;
    Ok(bill)
}

fn bill_not_found(id: BillId) -> RepoError {
    RepoError::NotFound {
        entity: "bill",
        key: id.to_string(),
    }
}

fn stored_billing_month(conn: &Connection, id: BillId) -> RepoResult<NaiveDate> {
    conn.query_row(
        "SELECT billing_month FROM bills WHERE id = ?1;",
        [id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| bill_not_found(id))
}

fn ensure_month_open(conn: &Connection, month: NaiveDate) -> RepoResult<()> {
    if month_is_closed(conn, month)? {
        return Err(RepoError::MonthClosed(month));
    }
    Ok(())
}
