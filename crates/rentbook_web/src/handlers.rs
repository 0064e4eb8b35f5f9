//! Request handlers.
//!
//! Every handler resolves "today" from the local clock, then runs one core
//! service call on a blocking thread with a freshly opened connection.

use crate::error::ApiError;
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Local, NaiveDate};
use log::info;
use rentbook_core::db::{diagnose, export_database, import_database, open_db, DbHealth};
use rentbook_core::{
    core_version, parse_month_input, BillDraft, BillId, BillRecord, BillService,
    DashboardService, DashboardSummary, ExpectedBillGrid, ExpectedBillService, MonthOverview,
    MonthService, MonthlySettlement, Settings, SettingsDraft, SettingsService, SqliteRepository,
    UtilityType, UtilityTypeId,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Write;

const SQLITE_CONTENT_TYPE: &str = "application/x-sqlite3";

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UtilityTypeQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewUtilityType {
    pub code: String,
    pub name: String,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": core_version() }))
}

pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardSummary>, ApiError> {
    let today = today();
    with_connection(&state, move |conn| {
        Ok(DashboardService::new(SqliteRepository::new(conn)).summary(today)?)
    })
    .await
    .map(Json)
}

pub async fn list_bills(State(state): State<AppState>) -> Result<Json<Vec<BillRecord>>, ApiError> {
    with_connection(&state, |conn| {
        Ok(BillService::new(SqliteRepository::new(conn)).list_bills()?)
    })
    .await
    .map(Json)
}

pub async fn get_bill(
    State(state): State<AppState>,
    id: Result<Path<BillId>, PathRejection>,
) -> Result<Json<BillRecord>, ApiError> {
    let Path(id) = id?;
    with_connection(&state, move |conn| {
        Ok(BillService::new(SqliteRepository::new(conn)).get_bill(id)?)
    })
    .await
    .map(Json)
}

pub async fn create_bill(
    State(state): State<AppState>,
    payload: Result<Json<BillDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<BillRecord>), ApiError> {
    let Json(draft) = payload?;
    let today = today();
    let record = with_connection(&state, move |conn| {
        Ok(BillService::new(SqliteRepository::new(conn)).create_bill(&draft, today)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_bill(
    State(state): State<AppState>,
    id: Result<Path<BillId>, PathRejection>,
    payload: Result<Json<BillDraft>, JsonRejection>,
) -> Result<Json<BillRecord>, ApiError> {
    let Path(id) = id?;
    let Json(draft) = payload?;
    let today = today();
    with_connection(&state, move |conn| {
        Ok(BillService::new(SqliteRepository::new(conn)).update_bill(id, &draft, today)?)
    })
    .await
    .map(Json)
}

pub async fn delete_bill(
    State(state): State<AppState>,
    id: Result<Path<BillId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    with_connection(&state, move |conn| {
        Ok(BillService::new(SqliteRepository::new(conn)).delete_bill(id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_months(
    State(state): State<AppState>,
) -> Result<Json<Vec<MonthOverview>>, ApiError> {
    with_connection(&state, |conn| {
        Ok(MonthService::new(SqliteRepository::new(conn)).list_months()?)
    })
    .await
    .map(Json)
}

pub async fn settlement(
    State(state): State<AppState>,
    month: Result<Path<String>, PathRejection>,
) -> Result<Json<MonthlySettlement>, ApiError> {
    let month = month_param(month?)?;
    with_connection(&state, move |conn| {
        Ok(MonthService::new(SqliteRepository::new(conn)).settlement(month)?)
    })
    .await
    .map(Json)
}

pub async fn close_month(
    State(state): State<AppState>,
    month: Result<Path<String>, PathRejection>,
) -> Result<Json<MonthlySettlement>, ApiError> {
    let month = month_param(month?)?;
    let today = today();
    with_connection(&state, move |conn| {
        Ok(MonthService::new(SqliteRepository::new(conn)).close_month(month, today)?)
    })
    .await
    .map(Json)
}

pub async fn reopen_month(
    State(state): State<AppState>,
    month: Result<Path<String>, PathRejection>,
) -> Result<Json<MonthlySettlement>, ApiError> {
    let month = month_param(month?)?;
    with_connection(&state, move |conn| {
        Ok(MonthService::new(SqliteRepository::new(conn)).reopen_month(month)?)
    })
    .await
    .map(Json)
}

pub async fn expected_bills(
    State(state): State<AppState>,
    query: Result<Query<YearQuery>, QueryRejection>,
) -> Result<Json<ExpectedBillGrid>, ApiError> {
    let Query(query) = query?;
    with_connection(&state, move |conn| {
        let repo = SqliteRepository::new(conn);
        let year = match query.year {
            Some(year) => year,
            None => SettingsService::new(repo).get_settings()?.active_year,
        };
        Ok(ExpectedBillService::new(repo).grid(year)?)
    })
    .await
    .map(Json)
}

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, ApiError> {
    with_connection(&state, |conn| {
        Ok(SettingsService::new(SqliteRepository::new(conn)).get_settings()?)
    })
    .await
    .map(Json)
}

pub async fn save_settings(
    State(state): State<AppState>,
    payload: Result<Json<SettingsDraft>, JsonRejection>,
) -> Result<Json<Settings>, ApiError> {
    let Json(draft) = payload?;
    with_connection(&state, move |conn| {
        Ok(SettingsService::new(SqliteRepository::new(conn)).save_settings(&draft)?)
    })
    .await
    .map(Json)
}

pub async fn list_utility_types(
    State(state): State<AppState>,
    query: Result<Query<UtilityTypeQuery>, QueryRejection>,
) -> Result<Json<Vec<UtilityType>>, ApiError> {
    let Query(query) = query?;
    with_connection(&state, move |conn| {
        Ok(SettingsService::new(SqliteRepository::new(conn))
            .list_utility_types(query.include_inactive)?)
    })
    .await
    .map(Json)
}

pub async fn add_utility_type(
    State(state): State<AppState>,
    payload: Result<Json<NewUtilityType>, JsonRejection>,
) -> Result<(StatusCode, Json<UtilityType>), ApiError> {
    let Json(input) = payload?;
    let created = with_connection(&state, move |conn| {
        Ok(SettingsService::new(SqliteRepository::new(conn))
            .add_utility_type(&input.code, &input.name)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn deactivate_utility_type(
    State(state): State<AppState>,
    id: Result<Path<UtilityTypeId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    with_connection(&state, move |conn| {
        Ok(SettingsService::new(SqliteRepository::new(conn)).deactivate_utility_type(id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn activate_utility_type(
    State(state): State<AppState>,
    id: Result<Path<UtilityTypeId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    with_connection(&state, move |conn| {
        Ok(SettingsService::new(SqliteRepository::new(conn)).activate_utility_type(id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Streams a consistent snapshot of the live database as a download.
pub async fn export_backup(State(state): State<AppState>) -> Result<Response, ApiError> {
    let bytes = with_connection(&state, |conn| {
        let staging = tempfile::tempdir()?;
        let snapshot = staging.path().join("export.db");
        export_database(conn, &snapshot)?;
        Ok(std::fs::read(&snapshot)?)
    })
    .await?;

    info!(
        "event=backup_download module=web status=ok bytes={}",
        bytes.len()
    );
    let file_name = format!("rentbook-{}.db", today().format("%Y%m%d"));
    let headers = [
        (header::CONTENT_TYPE, SQLITE_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

/// Replaces the live database with the uploaded file after validating it.
pub async fn import_backup(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DbHealth>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("uploaded database is empty"));
    }

    with_connection(&state, move |conn| {
        let mut upload = tempfile::NamedTempFile::new()?;
        upload.write_all(&body)?;
        upload.flush()?;
        import_database(conn, upload.path()).map_err(ApiError::from_import)?;
        Ok(diagnose(conn)?)
    })
    .await
    .map(Json)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn month_param(Path(raw): Path<String>) -> Result<NaiveDate, ApiError> {
    parse_month_input(&raw)
        .ok_or_else(|| ApiError::bad_request(format!("invalid billing month `{raw}`")))
}

async fn with_connection<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T, ApiError> + Send + 'static,
{
    let db_path = state.db_path().to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut conn = open_db(&db_path)?;
        f(&mut conn)
    })
    .await
    .map_err(|err| ApiError::internal(format!("request worker failed: {err}")))?
}
