//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//! - Ensure the default rows (settings singleton, stock utility types) exist.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Default rows are inserted with `INSERT OR IGNORE`; user edits survive.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("0002_received_index.sql"),
    },
];

const DEFAULT_ROWS_SQL: &str = include_str!("defaults.sql");

/// Tables every usable rentbook database must contain.
pub const REQUIRED_TABLES: &[&str] = &["utility_types", "bills", "billing_months", "settings"];

/// Columns the repositories read from each required table.
pub const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("utility_types", &["id", "code", "name", "is_active"]),
    (
        "bills",
        &[
            "id",
            "utility_type",
            "consumption_month",
            "received_date",
            "amount",
            "billing_month",
            "is_paid",
            "paid_date",
            "note",
            "created_at",
        ],
    ),
    ("billing_months", &["billing_month", "is_closed", "closed_at"]),
    ("settings", &["id", "rent_amount", "billing_day", "active_year"]),
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    Ok(())
}

/// Inserts the settings singleton and stock utility types when missing.
pub fn ensure_default_rows(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(DEFAULT_ROWS_SQL)?;
    Ok(())
}

pub(crate) fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Lists `table.column` pairs from `REQUIRED_COLUMNS` that `conn` lacks.
pub(crate) fn missing_columns(conn: &Connection) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let mut missing = Vec::new();
    for (table, columns) in REQUIRED_COLUMNS {
        let present = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        missing.extend(
            columns
                .iter()
                .filter(|column| !present.contains(**column))
                .map(|column| format!("{table}.{column}")),
        );
    }
    Ok(missing)
}
