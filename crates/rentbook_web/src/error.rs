//! HTTP error envelope and domain error mapping.
//!
//! # Invariants
//! - Every error body is `{"error": message}`.
//! - Validation maps to 400, missing rows to 404, closed months and duplicate
//!   codes to 409, storage failures to 500.
//! - Server-side failures are logged; client errors are not echoed to stderr.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, info};
use rentbook_core::db::DbError;
use rentbook_core::{
    BillServiceError, ExpectedBillServiceError, MonthServiceError, RepoError,
    SettingsServiceError,
};
use serde_json::json;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Maps import failures: a bad upload is the client's fault.
    pub fn from_import(err: DbError) -> Self {
        match err {
            DbError::InvalidBackup(_) | DbError::UnsupportedSchemaVersion { .. } => {
                Self::bad_request(err.to_string())
            }
            other => other.into(),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(
                "event=api_error module=web status=error code={} error={}",
                self.status.as_u16(),
                self.message
            );
        } else {
            info!(
                "event=api_reject module=web status=error code={}",
                self.status.as_u16()
            );
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(value: DbError) -> Self {
        Self::internal(value.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(value: std::io::Error) -> Self {
        Self::internal(format!("io failure: {value}"))
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        let status = match &value {
            RepoError::Validation(_) => StatusCode::BAD_REQUEST,
            RepoError::NotFound { .. } => StatusCode::NOT_FOUND,
            RepoError::Duplicate { .. } | RepoError::MonthClosed(_) => StatusCode::CONFLICT,
            RepoError::Db(_) | RepoError::InvalidData(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, value.to_string())
    }
}

impl From<BillServiceError> for ApiError {
    fn from(value: BillServiceError) -> Self {
        let message = value.to_string();
        let status = match value {
            BillServiceError::UnknownUtilityType(_)
            | BillServiceError::InvalidConsumptionMonth(_)
            | BillServiceError::InvalidReceivedDate(_)
            | BillServiceError::ReceivedInFuture(_)
            | BillServiceError::InvalidAmount(_)
            | BillServiceError::NonPositiveAmount(_) => StatusCode::BAD_REQUEST,
            BillServiceError::MonthClosed(_) => StatusCode::CONFLICT,
            BillServiceError::BillNotFound(_) => StatusCode::NOT_FOUND,
            BillServiceError::Repo(err) => return err.into(),
            BillServiceError::InconsistentState(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, message)
    }
}

impl From<MonthServiceError> for ApiError {
    fn from(value: MonthServiceError) -> Self {
        let message = value.to_string();
        match value {
            MonthServiceError::NotMonthStart(_) => Self::bad_request(message),
            MonthServiceError::Repo(err) => err.into(),
        }
    }
}

impl From<ExpectedBillServiceError> for ApiError {
    fn from(value: ExpectedBillServiceError) -> Self {
        let message = value.to_string();
        match value {
            ExpectedBillServiceError::YearOutOfRange(_) => Self::bad_request(message),
            ExpectedBillServiceError::Repo(err) => err.into(),
        }
    }
}

impl From<SettingsServiceError> for ApiError {
    fn from(value: SettingsServiceError) -> Self {
        let message = value.to_string();
        let status = match value {
            SettingsServiceError::InvalidRentAmount(_)
            | SettingsServiceError::NegativeRentAmount(_)
            | SettingsServiceError::InvalidBillingDay(_)
            | SettingsServiceError::InvalidActiveYear(_)
            | SettingsServiceError::EmptyUtilityCode
            | SettingsServiceError::EmptyUtilityName => StatusCode::BAD_REQUEST,
            SettingsServiceError::DuplicateUtilityCode(_) => StatusCode::CONFLICT,
            SettingsServiceError::UtilityTypeNotFound(_) => StatusCode::NOT_FOUND,
            SettingsServiceError::Repo(err) => return err.into(),
        };
        Self::new(status, message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::bad_request(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        Self::bad_request(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self::bad_request(value.body_text())
    }
}
