//! Whole-database export and import.
//!
//! # Responsibility
//! - Produce a consistent copy of the live database file.
//! - Validate an uploaded database file and restore it over the live one.
//!
//! # Invariants
//! - Both directions go through SQLite's online backup API, never a raw file
//!   copy, so concurrent readers never observe a torn file.
//! - The source of an import is opened read-only and is never modified.
//! - An import is first restored into an in-memory staging database, which
//!   must bootstrap cleanly and expose every required column. The live
//!   database is written only after staging succeeds.
//! - After a restore the live connection is re-bootstrapped (pragmas,
//!   migrations, default rows).

use super::migrations::{
    current_user_version, latest_version, missing_columns, table_exists, REQUIRED_TABLES,
};
use super::open::bootstrap_connection;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::backup::{Backup, Progress};
use rusqlite::{Connection, DatabaseName, OpenFlags};
use std::io::Read;
use std::path::Path;
use std::time::{Duration, Instant};

const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";
const COPY_PAGES_PER_STEP: i32 = 256;

/// Writes a consistent snapshot of `conn` to `dst`, replacing any file there.
pub fn export_database(conn: &Connection, dst: impl AsRef<Path>) -> DbResult<()> {
    let started_at = Instant::now();
    let dst = dst.as_ref();

    match conn.backup(DatabaseName::Main, dst, None) {
        Ok(()) => {
            info!(
                "event=db_export module=db status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(())
        }
        Err(err) => {
            error!(
                "event=db_export module=db status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

/// Replaces the contents of `conn` with the database stored at `src`.
///
/// # Errors
/// - `InvalidBackup` when `src` is not a SQLite file, fails
///   `integrity_check`, lacks required tables or columns, or cannot be
///   migrated to the current schema.
/// - `UnsupportedSchemaVersion` when `src` was written by a newer binary.
///
/// On error the live database is left as it was.
pub fn import_database(conn: &mut Connection, src: impl AsRef<Path>) -> DbResult<()> {
    let started_at = Instant::now();
    let src = src.as_ref();
    info!("event=db_import module=db status=start");

    let result = validate_backup(src)
        .and_then(|page_size| stage_backup(src, page_size))
        .and_then(|staged| {
            Backup::new(&staged, conn)?.run_to_completion(
                COPY_PAGES_PER_STEP,
                Duration::ZERO,
                None,
            )?;
            bootstrap_connection(conn)
        });

    match &result {
        Ok(()) => info!(
            "event=db_import module=db status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_import module=db status=error duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

/// Checks the candidate file read-only and returns its page size.
fn validate_backup(src: &Path) -> DbResult<i64> {
    let mut header = [0_u8; 16];
    let mut file = std::fs::File::open(src)?;
    if file.read_exact(&mut header).is_err() || &header != SQLITE_HEADER {
        return Err(DbError::InvalidBackup(
            "file is not a SQLite database".to_string(),
        ));
    }

    let candidate = Connection::open_with_flags(
        src,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let integrity: String = candidate.query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;
    if integrity != "ok" {
        return Err(DbError::InvalidBackup(format!(
            "integrity check failed: {integrity}"
        )));
    }

    let version = current_user_version(&candidate)?;
    let latest = latest_version();
    if version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: version,
            latest_supported: latest,
        });
    }

    for table in REQUIRED_TABLES {
        if !table_exists(&candidate, table)? {
            return Err(DbError::InvalidBackup(format!("missing table `{table}`")));
        }
    }

    let page_size = candidate.query_row("PRAGMA page_size;", [], |row| row.get(0))?;
    Ok(page_size)
}

/// Restores `src` into a private in-memory database and upgrades it there.
fn stage_backup(src: &Path, page_size: i64) -> DbResult<Connection> {
    let mut staged = Connection::open_in_memory()?;
    staged.execute_batch(&format!("PRAGMA page_size = {page_size};"))?;
    staged.restore(DatabaseName::Main, src, None::<fn(Progress)>)?;

    bootstrap_connection(&mut staged).map_err(|err| match err {
        DbError::UnsupportedSchemaVersion { .. } => err,
        other => DbError::InvalidBackup(format!("schema cannot be upgraded: {other}")),
    })?;

    let missing = missing_columns(&staged)?;
    if !missing.is_empty() {
        return Err(DbError::InvalidBackup(format!(
            "missing columns: {}",
            missing.join(", ")
        )));
    }
    Ok(staged)
}
