use chrono::NaiveDate;
use rentbook_core::db::{export_database, import_database, open_db, open_db_in_memory, DbError};
use rentbook_core::{BillDraft, BillService, SettingsDraft, SettingsService, SqliteRepository};
use rust_decimal_macros::dec;
use rusqlite::Connection;

fn seed(conn: &Connection) {
    let repo = SqliteRepository::new(conn);
    SettingsService::new(repo)
        .save_settings(&SettingsDraft {
            rent_amount: "380".to_string(),
            billing_day: 12,
            active_year: 2024,
        })
        .unwrap();
    BillService::new(repo)
        .create_bill(
            &BillDraft {
                utility_type: "electricity".to_string(),
                consumption_month: "2024-05".to_string(),
                received_date: "2024-06-03".to_string(),
                amount: "61,40".to_string(),
                note: Some("HEP".to_string()),
            },
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        )
        .unwrap();
}

#[test]
fn export_then_import_replaces_live_database() {
    let dir = tempfile::tempdir().unwrap();
    let export_path = dir.path().join("export.db");

    let source = open_db(dir.path().join("source.db")).unwrap();
    seed(&source);
    export_database(&source, &export_path).unwrap();

    let mut target = open_db(dir.path().join("target.db")).unwrap();
    import_database(&mut target, &export_path).unwrap();

    let repo = SqliteRepository::new(&target);
    let settings = SettingsService::new(repo).get_settings().unwrap();
    assert_eq!(settings.rent_amount, dec!(380));
    assert_eq!(settings.billing_day, 12);

    let bills = BillService::new(repo).list_bills().unwrap();
    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0].bill.amount, dec!(61.40));
    assert_eq!(bills[0].bill.note.as_deref(), Some("HEP"));

    let foreign_keys: i64 = target
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn export_from_in_memory_database_is_readable() {
    let dir = tempfile::tempdir().unwrap();
    let export_path = dir.path().join("memory.db");

    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    export_database(&conn, &export_path).unwrap();

    let reopened = open_db(&export_path).unwrap();
    let count: i64 = reopened
        .query_row("SELECT COUNT(*) FROM bills;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn import_rejects_non_sqlite_file_and_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.db");
    std::fs::write(&bogus, b"definitely not a database").unwrap();

    let mut conn = open_db_in_memory().unwrap();
    seed(&conn);

    let err = import_database(&mut conn, &bogus).unwrap_err();
    assert!(matches!(err, DbError::InvalidBackup(_)));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM bills;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn import_rejects_database_without_required_tables() {
    let dir = tempfile::tempdir().unwrap();
    let foreign = dir.path().join("foreign.db");
    let other = Connection::open(&foreign).unwrap();
    other
        .execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT);")
        .unwrap();
    drop(other);

    let mut conn = open_db_in_memory().unwrap();
    let err = import_database(&mut conn, &foreign).unwrap_err();
    match err {
        DbError::InvalidBackup(message) => assert!(message.contains("missing table")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn import_rejects_database_from_newer_schema() {
    let dir = tempfile::tempdir().unwrap();
    let newer = dir.path().join("newer.db");
    let source = open_db(&newer).unwrap();
    source.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(source);

    let mut conn = open_db_in_memory().unwrap();
    let err = import_database(&mut conn, &newer).unwrap_err();
    assert!(matches!(err, DbError::UnsupportedSchemaVersion { db_version: 999, .. }));
}

#[test]
fn import_missing_file_returns_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut conn = open_db_in_memory().unwrap();

    let err = import_database(&mut conn, dir.path().join("absent.db")).unwrap_err();
    assert!(matches!(err, DbError::Io(_)));
}

#[test]
fn import_rejects_legacy_database_with_wrong_columns_and_keeps_live_file_usable() {
    let dir = tempfile::tempdir().unwrap();
    let live_path = dir.path().join("live.db");
    let upload = dir.path().join("upload.db");

    let other = Connection::open(&upload).unwrap();
    other
        .execute_batch(
            "CREATE TABLE utility_types (id INTEGER PRIMARY KEY);
             CREATE TABLE bills (id INTEGER PRIMARY KEY);
             CREATE TABLE billing_months (x TEXT);
             CREATE TABLE settings (id INTEGER PRIMARY KEY);",
        )
        .unwrap();
    drop(other);

    let mut live = open_db(&live_path).unwrap();
    seed(&live);

    let err = import_database(&mut live, &upload).unwrap_err();
    assert!(matches!(err, DbError::InvalidBackup(_)));

    let bills = BillService::new(SqliteRepository::new(&live))
        .list_bills()
        .unwrap();
    assert_eq!(bills.len(), 1);
    drop(live);

    let reopened = open_db(&live_path).unwrap();
    let settings = SettingsService::new(SqliteRepository::new(&reopened))
        .get_settings()
        .unwrap();
    assert_eq!(settings.rent_amount, dec!(380));
}

#[test]
fn import_rejects_current_version_database_missing_bill_columns() {
    let dir = tempfile::tempdir().unwrap();
    let upload = dir.path().join("upload.db");

    let source = open_db(&upload).unwrap();
    source
        .execute_batch(
            "DROP TABLE bills;
             CREATE TABLE bills (id INTEGER PRIMARY KEY, amount TEXT);",
        )
        .unwrap();
    drop(source);

    let mut conn = open_db_in_memory().unwrap();
    seed(&conn);

    let err = import_database(&mut conn, &upload).unwrap_err();
    match err {
        DbError::InvalidBackup(message) => {
            assert!(message.contains("bills.billing_month"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM bills;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}
