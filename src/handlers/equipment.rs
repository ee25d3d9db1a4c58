use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

/// List equipment, filtered by room and/or connectivity
pub async fn list_equipment(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EquipmentListQuery>,
) -> Result<Json<Vec<Equipment>>, ApiError> {
    let items = state.store.list_equipment(&query).await?;
    Ok(Json(items))
}

pub async fn get_equipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Equipment>, ApiError> {
    let equipment = state.store.get_equipment(id).await?;
    Ok(Json(equipment))
}

pub async fn create_equipment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEquipmentRequest>,
) -> Result<(StatusCode, Json<Equipment>), ApiError> {
    let equipment = state.store.create_equipment(&req).await?;
    Ok(created(equipment))
}

pub async fn update_equipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateEquipmentRequest>,
) -> Result<Json<Equipment>, ApiError> {
    let equipment = state.store.update_equipment(id, &req).await?;
    Ok(Json(equipment))
}

/// Delete equipment after releasing its port links
pub async fn delete_equipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<UnlinkOutcome>, ApiError> {
    let outcome = state.store.delete_equipment(id).await?;
    Ok(Json(outcome))
}

/// Move equipment to a room, or out of its room when `room_id` is null
pub async fn assign_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<AssignRoomRequest>,
) -> Result<Json<UnlinkOutcome>, ApiError> {
    let outcome = state.store.assign_equipment_room(id, req.room_id).await?;
    Ok(Json(outcome))
}

pub async fn unlink_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<UnlinkOutcome>, ApiError> {
    let outcome = state.store.unlink_equipment_from_room(id).await?;
    Ok(Json(outcome))
}

pub async fn mark_defective(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<MarkDefectiveRequest>,
) -> Result<Json<UnlinkOutcome>, ApiError> {
    let outcome = state
        .store
        .mark_equipment_defective(id, req.defective)
        .await?;
    Ok(Json(outcome))
}

/// Where the equipment terminates on a patch panel, or null
pub async fn patch_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Option<EquipmentPatchInfo>>, ApiError> {
    let info = state.store.equipment_patch_info(id).await?;
    Ok(Json(info))
}
