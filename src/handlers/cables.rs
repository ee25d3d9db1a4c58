use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

/// List cables with optional status, kind and connected filters
pub async fn list_cables(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CableListQuery>,
) -> Result<Json<Vec<CableView>>, ApiError> {
    let cables = state.store.list_cables(&query).await?;
    Ok(Json(cables))
}

pub async fn get_cable(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Cable>, ApiError> {
    let cable = state.store.get_cable(id).await?;
    Ok(Json(cable))
}

pub async fn register_cable(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterCableRequest>,
) -> Result<(StatusCode, Json<Cable>), ApiError> {
    let cable = state.store.register_cable(&req).await?;
    Ok(created(cable))
}

pub async fn update_cable(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<RegisterCableRequest>,
) -> Result<Json<Cable>, ApiError> {
    let cable = state.store.update_cable(id, &req).await?;
    Ok(Json(cable))
}

pub async fn delete_cable(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_cable(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_defective(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<MarkCableDefectiveRequest>,
) -> Result<Json<Cable>, ApiError> {
    let cable = state.store.mark_cable_defective(id, &req.reason).await?;
    Ok(Json(cable))
}

pub async fn repair(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<RepairCableRequest>,
) -> Result<Json<Cable>, ApiError> {
    let cable = state.store.repair_cable(id, &req).await?;
    Ok(Json(cable))
}

/// Open cable connections, newest first
pub async fn list_open_connections(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CableConnection>>, ApiError> {
    let connections = state.store.list_open_cable_connections().await?;
    Ok(Json(connections))
}

pub async fn create_connection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCableConnectionRequest>,
) -> Result<(StatusCode, Json<CableConnection>), ApiError> {
    let conn = state.store.create_cable_connection(&req).await?;
    Ok(created(conn))
}

/// Close a cable connection; the row stays as history
pub async fn close_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CableConnection>, ApiError> {
    let conn = state.store.close_cable_connection(id).await?;
    Ok(Json(conn))
}
