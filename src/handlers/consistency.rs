use axum::{extract::State, Json};
use std::sync::Arc;

use crate::models::ConsistencyReport;
use crate::AppState;

use super::ApiError;

/// Audit link invariants without repairing anything
pub async fn check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConsistencyReport>, ApiError> {
    let report = state.store.check_consistency().await?;
    Ok(Json(report))
}
