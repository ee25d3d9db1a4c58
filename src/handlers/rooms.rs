use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Room>>, ApiError> {
    let rooms = state.store.list_rooms().await?;
    Ok(Json(rooms))
}

pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Room>, ApiError> {
    let room = state.store.get_room(id).await?;
    Ok(Json(room))
}

pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<Room>), ApiError> {
    let room = state.store.create_room(&req).await?;
    Ok(created(room))
}

/// Edit a room, optionally replacing its equipment set
pub async fn update_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRoomRequest>,
) -> Result<Json<RoomUpdateOutcome>, ApiError> {
    let outcome = state.store.update_room(id, &req).await?;
    Ok(Json(outcome))
}

/// Delete a room; its equipment is unlinked first
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<UnlinkOutcome>>, ApiError> {
    let unlinked = state.store.delete_room(id).await?;
    Ok(Json(unlinked))
}

/// Replace the room's equipment set
pub async fn reassign_equipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ReassignRoomRequest>,
) -> Result<Json<ReassignOutcome>, ApiError> {
    let outcome = state
        .store
        .reassign_room_equipment(id, &req.equipment_ids)
        .await?;
    Ok(Json(outcome))
}

/// Cable connection history recorded in a room
pub async fn list_cable_connections(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<CableConnection>>, ApiError> {
    let history = state.store.list_cable_connections_for_room(id).await?;
    Ok(Json(history))
}

pub async fn list_switches(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<RoomSwitchUsage>>, ApiError> {
    let usage = state.store.switches_for_room(id).await?;
    Ok(Json(usage))
}
