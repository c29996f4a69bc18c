//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    response::Json,
};
use tracing::info;

use crate::{
    error::ApiError,
    state::{AppState, Table, TableDetails, TableId},
};
use super::responses::{
    AddTimeRequest, ApiResponse, HealthResponse, StartRequest, StatusResponse, TableView,
};

fn view(state: &AppState, table: Table) -> TableView {
    let remaining_seconds = state.sync.remaining_seconds(&table.session);
    TableView::new(table, remaining_seconds)
}

fn respond(state: &AppState, message: String, table: Table) -> Json<ApiResponse> {
    Json(ApiResponse::new(message, view(state, table)))
}

/// Handle GET /tables - List every table with its remaining time
pub async fn list_tables_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TableView>>, ApiError> {
    let tables = state.tables.list()?;
    Ok(Json(
        tables.into_iter().map(|table| view(&state, table)).collect(),
    ))
}

/// Handle GET /tables/:id
pub async fn get_table_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TableId>,
) -> Result<Json<TableView>, ApiError> {
    let table = state.tables.get(id)?;
    Ok(Json(view(&state, table)))
}

/// Handle POST /tables/:id/start - Start a session
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TableId>,
    Json(request): Json<StartRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let table = state.start_session(id, request.duration_minutes * 60.0)?;
    info!("Start endpoint called - table {} running", id);
    Ok(respond(
        &state,
        format!("Session started for {} minutes", request.duration_minutes),
        table,
    ))
}

/// Handle POST /tables/:id/pause
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TableId>,
) -> Result<Json<ApiResponse>, ApiError> {
    let table = state.pause(id)?;
    Ok(respond(&state, "Session paused".to_string(), table))
}

/// Handle POST /tables/:id/resume
pub async fn resume_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TableId>,
) -> Result<Json<ApiResponse>, ApiError> {
    let table = state.resume(id)?;
    Ok(respond(&state, "Session resumed".to_string(), table))
}

/// Handle POST /tables/:id/add-time - Add or subtract minutes
pub async fn add_time_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TableId>,
    Json(request): Json<AddTimeRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let table = state.add_time(id, request.minutes * 60.0)?;
    Ok(respond(
        &state,
        format!("Session adjusted by {} minutes", request.minutes),
        table,
    ))
}

/// Handle PATCH /tables/:id - Update guest count, server or notes
pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TableId>,
    Json(details): Json<TableDetails>,
) -> Result<Json<ApiResponse>, ApiError> {
    if details.guest_count.is_none() && details.server.is_none() && details.notes.is_none() {
        return Err(ApiError::BadRequest("no table details to update".to_string()));
    }
    let table = state.update_details(id, details)?;
    Ok(respond(&state, "Table details updated".to_string(), table))
}

/// Handle POST /tables/:id/end
pub async fn end_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TableId>,
) -> Result<Json<ApiResponse>, ApiError> {
    let table = state.end_session(id)?;
    info!("End endpoint called - table {} idle", id);
    Ok(respond(&state, "Session ended".to_string(), table))
}

/// Handle GET /status - Return current service status
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let table_count = state.tables.list()?.len();
    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        ticker: state.get_ticker_state(),
        table_count,
        update_mode: if state.per_table_updates { "per-table" } else { "batched" }.to_string(),
        tick_interval_ms: state.tick_interval.as_millis(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
