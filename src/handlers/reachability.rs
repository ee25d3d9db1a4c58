use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::{ApiError, MessageResponse};

/// Probe every addressable equipment and record the results
pub async fn sweep(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SweepSummary>, ApiError> {
    let summary = state.store.sweep_reachability(state.prober.as_ref()).await?;
    Ok(Json(summary))
}

pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PingLogQuery>,
) -> Result<Json<Vec<PingLog>>, ApiError> {
    let logs = state.store.list_ping_logs(query.limit).await?;
    Ok(Json(logs))
}

pub async fn clear_logs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = state.store.clear_ping_logs().await?;
    Ok(MessageResponse::new(format!("removed {} ping logs", removed)))
}
