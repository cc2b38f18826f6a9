use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use rust_xlsxwriter::XlsxError;
use serde_json::json;
use axum::Json;
use thiserror::Error;

/// Normalization failures. Either the source cannot be parsed as tabular
/// data at all, or the header yields no name/price column. Both reject the
/// source wholesale; previously stored sources are unaffected.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("required {0} column not found in source")]
    MissingRequiredColumn(&'static str),
    #[error("source could not be read as tabular data: {0}")]
    UnreadableSource(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("upload quota of {0} sources reached")]
    QuotaExceeded(usize),
    #[error("session holds no sources")]
    EmptySession,
    #[error("raw data for the detailed report is no longer available")]
    StaleSnapshot,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("failed to write workbook: {0}")]
    Workbook(#[from] XlsxError),
}

#[derive(Debug)]
pub enum AppError {
    InvalidInput(String),
    IoError(std::io::Error),
    Schema(SchemaError),
    Session(SessionError),
    Report(ReportError),
    DatabaseError(String),
    DownloadError(String),
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::IoError(err) => write!(f, "IO error: {}", err),
            AppError::Schema(err) => write!(f, "Schema error: {}", err),
            AppError::Session(err) => write!(f, "Session error: {}", err),
            AppError::Report(err) => write!(f, "Report error: {}", err),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::DownloadError(msg) => write!(f, "Download error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<SchemaError> for AppError {
    fn from(err: SchemaError) -> Self {
        AppError::Schema(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        AppError::Report(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::IoError(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            AppError::Schema(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            AppError::Session(SessionError::QuotaExceeded(n)) => {
                (StatusCode::CONFLICT, SessionError::QuotaExceeded(n).to_string())
            }
            AppError::Session(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::Report(ReportError::Session(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::Report(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            AppError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::DownloadError(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
