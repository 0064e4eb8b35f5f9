use chrono::NaiveDate;
use rentbook_core::db::open_db_in_memory;
use rentbook_core::{
    BillDraft, BillService, DashboardService, MonthService, MonthServiceError, SettingsDraft,
    SettingsService, SqliteRepository,
};
use rust_decimal_macros::dec;
use rusqlite::Connection;

fn setup() -> Connection {
    let conn = open_db_in_memory().unwrap();
    SettingsService::new(SqliteRepository::new(&conn))
        .save_settings(&SettingsDraft {
            rent_amount: "450,00".to_string(),
            billing_day: 10,
            active_year: 2024,
        })
        .unwrap();
    conn
}

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn add_bill(conn: &Connection, utility: &str, received: &str, amount: &str) -> i64 {
    BillService::new(SqliteRepository::new(conn))
        .create_bill(
            &BillDraft {
                utility_type: utility.to_string(),
                consumption_month: "2024-02".to_string(),
                received_date: received.to_string(),
                amount: amount.to_string(),
                note: None,
            },
            day(2024, 4, 30),
        )
        .unwrap()
        .bill
        .id
        .unwrap()
}

#[test]
fn settlement_sums_utilities_and_adds_previous_month_rent() {
    let conn = setup();
    add_bill(&conn, "water", "2024-03-02", "12,50");
    add_bill(&conn, "electricity", "2024-03-05", "40.25");
    add_bill(&conn, "water", "2024-03-01", "7.50");
    add_bill(&conn, "gas", "2024-03-20", "99");

    let service = MonthService::new(SqliteRepository::new(&conn));
    let settlement = service.settlement(day(2024, 3, 1)).unwrap();

    assert_eq!(settlement.label, "ožujak-2024");
    assert_eq!((settlement.year, settlement.month), (2024, 3));
    assert_eq!(settlement.rent_month, day(2024, 2, 1));
    assert_eq!(settlement.rent_month_label, "veljača-2024");
    assert_eq!(settlement.total_utility, dec!(60.25));
    assert_eq!(settlement.rent_amount, dec!(450.00));
    assert_eq!(settlement.grand_total, dec!(510.25));
    assert!(!settlement.is_closed);

    let order: Vec<(&str, NaiveDate)> = settlement
        .bills
        .iter()
        .map(|bill| (bill.utility_type.as_str(), bill.received_date))
        .collect();
    assert_eq!(
        order,
        vec![
            ("electricity", day(2024, 3, 5)),
            ("water", day(2024, 3, 1)),
            ("water", day(2024, 3, 2)),
        ]
    );

    assert_eq!(settlement.utility_totals.len(), 2);
    let water = &settlement.utility_totals[1];
    assert_eq!(water.utility_type, "water");
    assert_eq!(water.bill_count, 2);
    assert_eq!(water.amount, dec!(20.00));
}

#[test]
fn january_settlement_charges_december_rent() {
    let conn = setup();
    let service = MonthService::new(SqliteRepository::new(&conn));

    let settlement = service.settlement(day(2024, 1, 1)).unwrap();
    assert_eq!(settlement.rent_month, day(2023, 12, 1));
    assert!(settlement.bills.is_empty());
    assert_eq!(settlement.total_utility, dec!(0));
    assert_eq!(settlement.grand_total, dec!(450.00));
}

#[test]
fn close_marks_bills_paid_and_reopen_clears_them() {
    let conn = setup();
    let march_bill = add_bill(&conn, "water", "2024-03-02", "10");
    let april_bill = add_bill(&conn, "gas", "2024-03-25", "20");
    let repo = SqliteRepository::new(&conn);
    let service = MonthService::new(repo);
    let bills = BillService::new(repo);

    let closed = service.close_month(day(2024, 3, 1), day(2024, 4, 2)).unwrap();
    assert!(closed.is_closed);
    assert!(closed.closed_at.is_some());
    assert!(closed.bills.iter().all(|bill| bill.is_paid));
    assert!(closed
        .bills
        .iter()
        .all(|bill| bill.paid_date == Some(day(2024, 4, 2))));

    let untouched = bills.get_bill(april_bill).unwrap();
    assert!(!untouched.bill.is_paid);

    let reopened = service.reopen_month(day(2024, 3, 1)).unwrap();
    assert!(!reopened.is_closed);
    assert!(reopened.closed_at.is_none());
    let record = bills.get_bill(march_bill).unwrap();
    assert!(!record.bill.is_paid);
    assert!(record.bill.paid_date.is_none());
    assert!(!record.month_closed);
}

#[test]
fn close_and_reopen_are_idempotent() {
    let conn = setup();
    add_bill(&conn, "water", "2024-03-02", "10");
    let service = MonthService::new(SqliteRepository::new(&conn));

    service.close_month(day(2024, 3, 1), day(2024, 4, 1)).unwrap();
    let again = service.close_month(day(2024, 3, 1), day(2024, 4, 1)).unwrap();
    assert!(again.is_closed);
    assert_eq!(again.bills.len(), 1);

    service.reopen_month(day(2024, 3, 1)).unwrap();
    let again = service.reopen_month(day(2024, 3, 1)).unwrap();
    assert!(!again.is_closed);
}

#[test]
fn closing_empty_month_records_status_row() {
    let conn = setup();
    let service = MonthService::new(SqliteRepository::new(&conn));

    let closed = service.close_month(day(2024, 6, 1), day(2024, 6, 15)).unwrap();
    assert!(closed.is_closed);
    assert_eq!(closed.grand_total, dec!(450.00));

    let months = service.list_months().unwrap();
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].billing_month, day(2024, 6, 1));
    assert_eq!(months[0].bill_count, 0);
    assert!(months[0].is_closed);
}

#[test]
fn month_operations_reject_non_month_start() {
    let conn = setup();
    let service = MonthService::new(SqliteRepository::new(&conn));

    let err = service.settlement(day(2024, 3, 15)).unwrap_err();
    assert!(matches!(err, MonthServiceError::NotMonthStart(_)));
    let err = service
        .close_month(day(2024, 3, 15), day(2024, 3, 20))
        .unwrap_err();
    assert!(matches!(err, MonthServiceError::NotMonthStart(_)));
    assert!(service.list_months().unwrap().is_empty());
}

#[test]
fn list_months_merges_bill_months_and_status_rows_newest_first() {
    let conn = setup();
    add_bill(&conn, "water", "2024-03-02", "10");
    add_bill(&conn, "gas", "2024-03-05", "5,55");
    add_bill(&conn, "water", "2024-04-02", "11");
    let service = MonthService::new(SqliteRepository::new(&conn));
    service.close_month(day(2024, 1, 1), day(2024, 2, 1)).unwrap();

    let months = service.list_months().unwrap();
    let keys: Vec<NaiveDate> = months.iter().map(|month| month.billing_month).collect();
    assert_eq!(keys, vec![day(2024, 4, 1), day(2024, 3, 1), day(2024, 1, 1)]);
    assert_eq!(months[1].bill_count, 2);
    assert_eq!(months[1].total_utility, dec!(15.55));
    assert_eq!(months[1].label, "ožujak-2024");
    assert!(months[2].is_closed);
}

#[test]
fn dashboard_reports_current_billing_month() {
    let conn = setup();
    add_bill(&conn, "water", "2024-03-12", "10");
    add_bill(&conn, "gas", "2024-04-02", "20");
    let service = DashboardService::new(SqliteRepository::new(&conn));

    let summary = service.summary(day(2024, 4, 8)).unwrap();
    assert_eq!(summary.current_billing_month, day(2024, 4, 1));
    assert_eq!(summary.current_billing_month_label, "travanj-2024");
    assert_eq!(summary.rent_month, day(2024, 3, 1));
    assert_eq!(summary.bills_in_current_month, 2);
    assert_eq!(summary.current_month_utility_total, dec!(30));
    assert!(!summary.is_current_closed);
    assert_eq!(summary.settings.active_year, 2024);
    // Four stock types times twelve months, minus the two received cells.
    assert_eq!(summary.missing_count, 46);

    let after_cutoff = service.summary(day(2024, 4, 11)).unwrap();
    assert_eq!(after_cutoff.current_billing_month, day(2024, 5, 1));
    assert_eq!(after_cutoff.bills_in_current_month, 0);
}
