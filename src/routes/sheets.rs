use axum::{
    extract::State,
    http::{header, Method},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::{
    error::AppError,
    services::{aggregate, fetch, normalizer, report},
    AppState,
};
use tower_http::cors::{Any, CorsLayer};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/sheets/upload", post(upload_sheet))
        .route("/sheets/report", post(combined_report))
        .route("/sheets/report/detailed", post(detailed_report))
        .route("/sheets/reset", post(reset_session))
        .route("/sheets/status", post(session_status))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    user_id: i64,
    username: Option<String>,
    file_name: String,
    signed_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    source_id: String,
    row_count: usize,
    stored_sources: usize,
    quota: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    stored_sources: usize,
    quota: usize,
}

#[axum::debug_handler]
async fn upload_sheet(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    let start = std::time::Instant::now();
    tracing::info!(
        "Upload request from user {}: {}",
        request.user_id,
        request.file_name
    );

    let extension = request
        .file_name
        .rsplit('.')
        .next()
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !normalizer::SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        tracing::error!("Unsupported file extension: {}", request.file_name);
        return Err(AppError::InvalidInput(format!(
            "Only spreadsheet files are supported ({})",
            normalizer::SUPPORTED_EXTENSIONS.join(", ")
        )));
    }

    let download_start = std::time::Instant::now();
    let file_data = fetch::load_file_from_url(&request.signed_url).await?;
    tracing::info!(
        "File downloaded, size: {}KB, took: {:?}",
        file_data.len() / 1024,
        download_start.elapsed()
    );

    if file_data.len() > state.config.max_file_size {
        return Err(AppError::InvalidInput(format!(
            "File exceeds the {} byte limit",
            state.config.max_file_size
        )));
    }

    let rows = normalizer::normalize(file_data, &extension)?;
    let row_count = rows.len();
    let stored_sources =
        state
            .sessions
            .add_source(request.user_id, request.file_name.clone(), rows)?;

    state
        .audit
        .log_user(request.user_id, request.username.as_deref())?;
    state.audit.log_file(request.user_id, &request.file_name)?;

    tracing::info!(
        "Stored source {} for user {} ({}/{}) in {:?}",
        request.file_name,
        request.user_id,
        stored_sources,
        state.sessions.quota(),
        start.elapsed()
    );

    Ok(Json(UploadResponse {
        source_id: request.file_name,
        row_count,
        stored_sources,
        quota: state.sessions.quota(),
    }))
}

#[axum::debug_handler]
async fn combined_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let start = std::time::Instant::now();
    tracing::info!("Combined report request from user {}", request.user_id);

    // Consuming clears the session while retaining the raw snapshot for
    // one detailed request.
    let tables = state.sessions.consume(request.user_id)?;
    let bytes = report::build_combined(&tables)?;

    state.audit.delete_user_files(request.user_id)?;
    tracing::info!(
        "Combined report for user {}: {} sources, {} bytes, took {:?}",
        request.user_id,
        tables.len(),
        bytes.len(),
        start.elapsed()
    );

    Ok(workbook_response(bytes, "Price_Comparison.xlsx"))
}

#[axum::debug_handler]
async fn detailed_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let start = std::time::Instant::now();
    tracing::info!("Detailed report request from user {}", request.user_id);

    let tables = state.sessions.take_raw_snapshot(request.user_id)?;
    let (summary, union, stats) = aggregate::aggregate(&tables)?;
    let bytes = report::build_detailed(&summary, &union, &stats)?;

    tracing::info!(
        "Detailed report for user {}: {} items over {} offers, took {:?}",
        request.user_id,
        stats.total_items,
        union.len(),
        start.elapsed()
    );

    Ok(workbook_response(bytes, "Detailed_Price_Analysis.xlsx"))
}

#[axum::debug_handler]
async fn reset_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    tracing::info!("Session reset for user {}", request.user_id);
    state.sessions.reset(request.user_id);
    state.audit.delete_user_files(request.user_id)?;

    Ok(Json(StatusResponse {
        stored_sources: 0,
        quota: state.sessions.quota(),
    }))
}

#[axum::debug_handler]
async fn session_status(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    Ok(Json(StatusResponse {
        stored_sources: state.sessions.count(request.user_id),
        quota: state.sessions.quota(),
    }))
}

fn workbook_response(bytes: Vec<u8>, filename: &str) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
}
