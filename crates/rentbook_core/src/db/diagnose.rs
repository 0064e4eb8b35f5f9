//! Read-only health report for an opened database.

use super::migrations::{current_user_version, latest_version, table_exists, REQUIRED_TABLES};
use super::DbResult;
use rusqlite::Connection;
use serde::Serialize;

/// Snapshot of schema and content health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbHealth {
    pub schema_version: u32,
    pub latest_supported: u32,
    /// First line of `PRAGMA integrity_check` (`ok` when healthy).
    pub integrity: String,
    pub missing_tables: Vec<String>,
    pub has_settings: bool,
    pub bill_count: i64,
    pub closed_month_count: i64,
    pub active_utility_type_count: i64,
}

impl DbHealth {
    /// Returns whether every check passed.
    pub fn is_healthy(&self) -> bool {
        self.schema_version == self.latest_supported
            && self.integrity == "ok"
            && self.missing_tables.is_empty()
            && self.has_settings
    }
}

/// Collects a [`DbHealth`] report without mutating the database.
pub fn diagnose(conn: &Connection) -> DbResult<DbHealth> {
    let integrity: String = conn.query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;

    let mut missing_tables = Vec::new();
    for table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            missing_tables.push((*table).to_string());
        }
    }

    let mut health = DbHealth {
        schema_version: current_user_version(conn)?,
        latest_supported: latest_version(),
        integrity,
        has_settings: false,
        bill_count: 0,
        closed_month_count: 0,
        active_utility_type_count: 0,
        missing_tables,
    };

    if !health.missing_tables.is_empty() {
        return Ok(health);
    }

    health.has_settings = count(conn, "SELECT COUNT(*) FROM settings;")? > 0;
    health.bill_count = count(conn, "SELECT COUNT(*) FROM bills;")?;
    health.closed_month_count =
        count(conn, "SELECT COUNT(*) FROM billing_months WHERE is_closed = 1;")?;
    health.active_utility_type_count =
        count(conn, "SELECT COUNT(*) FROM utility_types WHERE is_active = 1;")?;
    Ok(health)
}

fn count(conn: &Connection, sql: &str) -> DbResult<i64> {
    Ok(conn.query_row(sql, [], |row| row.get(0))?)
}
