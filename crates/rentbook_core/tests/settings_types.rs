use chrono::NaiveDate;
use rentbook_core::db::open_db_in_memory;
use rentbook_core::{
    BillDraft, BillRepository, BillService, ExpectedBillService, ExpectedBillServiceError,
    MonthService, RepoError, SettingsDraft, SettingsService, SettingsServiceError,
    SqliteRepository,
};
use rust_decimal_macros::dec;

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn settings_draft(rent: &str, billing_day: u32, active_year: i32) -> SettingsDraft {
    SettingsDraft {
        rent_amount: rent.to_string(),
        billing_day,
        active_year,
    }
}

#[test]
fn save_settings_round_trips_and_normalizes_rent() {
    let conn = open_db_in_memory().unwrap();
    let service = SettingsService::new(SqliteRepository::new(&conn));

    let saved = service
        .save_settings(&settings_draft(" 520,5 ", 15, 2025))
        .unwrap();
    assert_eq!(saved.rent_amount, dec!(520.50));

    let loaded = service.get_settings().unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(loaded.billing_day, 15);
    assert_eq!(loaded.active_year, 2025);
}

#[test]
fn save_settings_rejects_out_of_range_values() {
    let conn = open_db_in_memory().unwrap();
    let service = SettingsService::new(SqliteRepository::new(&conn));
    let before = service.get_settings().unwrap();

    assert!(matches!(
        service.save_settings(&settings_draft("abc", 10, 2024)),
        Err(SettingsServiceError::InvalidRentAmount(_))
    ));
    assert!(matches!(
        service.save_settings(&settings_draft("-1", 10, 2024)),
        Err(SettingsServiceError::NegativeRentAmount(_))
    ));
    assert!(matches!(
        service.save_settings(&settings_draft("100", 0, 2024)),
        Err(SettingsServiceError::InvalidBillingDay(0))
    ));
    assert!(matches!(
        service.save_settings(&settings_draft("100", 29, 2024)),
        Err(SettingsServiceError::InvalidBillingDay(29))
    ));
    assert!(matches!(
        service.save_settings(&settings_draft("100", 10, 1999)),
        Err(SettingsServiceError::InvalidActiveYear(1999))
    ));

    assert_eq!(service.get_settings().unwrap(), before);
}

#[test]
fn zero_rent_is_allowed() {
    let conn = open_db_in_memory().unwrap();
    let service = SettingsService::new(SqliteRepository::new(&conn));

    let saved = service.save_settings(&settings_draft("0", 28, 2024)).unwrap();
    assert_eq!(saved.rent_amount, dec!(0));
}

#[test]
fn changing_billing_day_keeps_existing_bill_months() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::new(&conn);
    let settings = SettingsService::new(repo);
    let bills = BillService::new(repo);
    settings.save_settings(&settings_draft("0", 10, 2024)).unwrap();

    let created = bills
        .create_bill(
            &BillDraft {
                utility_type: "water".to_string(),
                consumption_month: "2024-02".to_string(),
                received_date: "2024-03-15".to_string(),
                amount: "10".to_string(),
                note: None,
            },
            day(2024, 3, 20),
        )
        .unwrap();
    assert_eq!(created.bill.billing_month, day(2024, 4, 1));

    settings.save_settings(&settings_draft("0", 20, 2024)).unwrap();
    let reloaded = bills.get_bill(created.bill.id.unwrap()).unwrap();
    assert_eq!(reloaded.bill.billing_month, day(2024, 4, 1));
}

#[test]
fn add_utility_type_normalizes_code_and_rejects_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let service = SettingsService::new(SqliteRepository::new(&conn));

    let created = service.add_utility_type(" Hot Water ", " Topla voda ").unwrap();
    assert_eq!(created.code, "hot_water");
    assert_eq!(created.name, "Topla voda");
    assert!(created.is_active);

    let duplicate = service.add_utility_type("HOT WATER", "Druga").unwrap_err();
    assert!(matches!(duplicate, SettingsServiceError::DuplicateUtilityCode(code) if code == "hot_water"));

    assert!(matches!(
        service.add_utility_type("  ", "Prazno"),
        Err(SettingsServiceError::EmptyUtilityCode)
    ));
    assert!(matches!(
        service.add_utility_type("internet", " "),
        Err(SettingsServiceError::EmptyUtilityName)
    ));

    assert_eq!(service.list_utility_types(false).unwrap().len(), 5);
}

#[test]
fn deactivate_hides_type_and_activate_restores_it() {
    let conn = open_db_in_memory().unwrap();
    let service = SettingsService::new(SqliteRepository::new(&conn));

    let gas = service
        .list_utility_types(false)
        .unwrap()
        .into_iter()
        .find(|utility| utility.code == "gas")
        .unwrap();

    service.deactivate_utility_type(gas.id).unwrap();
    let active = service.list_utility_types(false).unwrap();
    assert!(active.iter().all(|utility| utility.code != "gas"));
    let all = service.list_utility_types(true).unwrap();
    assert!(all
        .iter()
        .any(|utility| utility.code == "gas" && !utility.is_active));

    service.activate_utility_type(gas.id).unwrap();
    assert_eq!(service.list_utility_types(false).unwrap().len(), 4);

    assert!(matches!(
        service.deactivate_utility_type(9_999),
        Err(SettingsServiceError::UtilityTypeNotFound(9_999))
    ));
}

#[test]
fn expected_grid_tracks_received_and_charged_cells() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::new(&conn);
    let settings = SettingsService::new(repo);
    settings.save_settings(&settings_draft("0", 10, 2024)).unwrap();
    let bills = BillService::new(repo);
    let today = day(2024, 12, 31);

    for (utility, consumption, received) in [
        ("water", "2024-01", "2024-02-05"),
        ("water", "2024-01", "2024-02-03"),
        ("gas", "2024-02", "2024-03-20"),
        ("water", "2023-12", "2024-01-05"),
    ] {
        bills
            .create_bill(
                &BillDraft {
                    utility_type: utility.to_string(),
                    consumption_month: consumption.to_string(),
                    received_date: received.to_string(),
                    amount: "10".to_string(),
                    note: None,
                },
                today,
            )
            .unwrap();
    }
    MonthService::new(repo)
        .close_month(day(2024, 2, 1), day(2024, 2, 28))
        .unwrap();

    let expected = ExpectedBillService::new(repo);
    let rows = expected.rows(2024).unwrap();
    assert_eq!(rows.len(), 48);

    let water_january = rows
        .iter()
        .find(|row| row.utility_type == "water" && row.consumption_month == day(2024, 1, 1))
        .unwrap();
    assert!(water_january.received);
    assert!(water_january.charged);
    assert_eq!(water_january.first_received_date, Some(day(2024, 2, 3)));
    assert_eq!(water_january.month_label, "siječanj-2024");

    let gas_february = rows
        .iter()
        .find(|row| row.utility_type == "gas" && row.consumption_month == day(2024, 2, 1))
        .unwrap();
    assert!(gas_february.received);
    assert!(!gas_february.charged);

    let waste_march = rows
        .iter()
        .find(|row| row.utility_type == "waste" && row.consumption_month == day(2024, 3, 1))
        .unwrap();
    assert!(!waste_march.received);
    assert_eq!(waste_march.first_received_date, None);

    assert_eq!(expected.missing_count(2024).unwrap(), 46);
    assert_eq!(expected.missing_count(2023).unwrap(), 47);
}

#[test]
fn expected_grid_rejects_years_outside_active_range() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::new(&conn);
    let expected = ExpectedBillService::new(repo);

    for year in [i32::MAX, i32::MIN, 1999, 2101] {
        let err = expected.rows(year).unwrap_err();
        assert!(matches!(err, ExpectedBillServiceError::YearOutOfRange(y) if y == year));
    }
    assert!(matches!(
        expected.grid(i32::MAX).unwrap_err(),
        ExpectedBillServiceError::YearOutOfRange(_)
    ));

    let grid = expected.grid(2100).unwrap();
    assert_eq!(grid.year, 2100);
    assert_eq!(grid.missing_count, grid.rows.len());
}

#[test]
fn consumption_stats_for_last_representable_year_is_an_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::new(&conn);

    let err = repo.consumption_stats(i32::MAX).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert!(repo.consumption_stats(2024).unwrap().is_empty());
}
