use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

/// List active direct connections
pub async fn list_connections(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ConnectionView>>, ApiError> {
    let connections = state.store.list_active_connections().await?;
    Ok(Json(connections))
}

pub async fn create_connection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateConnectionRequest>,
) -> Result<(StatusCode, Json<DirectConnection>), ApiError> {
    let conn = state.store.create_direct_connection(&req).await?;
    Ok(created(conn))
}

/// Deactivate a direct connection; the row is kept as history
pub async fn remove_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DirectConnection>, ApiError> {
    let conn = state.store.remove_direct_connection(id).await?;
    Ok(Json(conn))
}
