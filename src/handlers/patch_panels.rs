use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

/// List patch panels, optionally for one floor
pub async fn list_panels(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PatchPanelListQuery>,
) -> Result<Json<Vec<PatchPanelView>>, ApiError> {
    let panels = state.store.list_patch_panels(query.floor).await?;
    Ok(Json(panels))
}

pub async fn get_panel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PatchPanelView>, ApiError> {
    let panel = state.store.get_patch_panel(id).await?;
    Ok(Json(panel))
}

/// Create a patch panel and generate its ports
pub async fn create_panel(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePatchPanelRequest>,
) -> Result<(StatusCode, Json<PatchPanelView>), ApiError> {
    let panel = state.store.create_patch_panel(&req).await?;
    Ok(created(panel))
}

pub async fn update_panel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePatchPanelRequest>,
) -> Result<Json<PatchPanelView>, ApiError> {
    let panel = state.store.update_patch_panel(id, &req).await?;
    Ok(Json(panel))
}

pub async fn delete_panel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_patch_panel(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List a panel's ports with mapping and equipment details
pub async fn list_ports(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PatchPortView>>, ApiError> {
    let ports = state.store.list_patch_ports(id).await?;
    Ok(Json(ports))
}

/// Set or clear a patch port's switch mapping
pub async fn map_port(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<MapPatchPortRequest>,
) -> Result<Json<PatchPortView>, ApiError> {
    let port = state.store.map_patch_port(id, &req).await?;
    Ok(Json(port))
}

pub async fn connect_equipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ConnectEquipmentRequest>,
) -> Result<Json<PatchPortView>, ApiError> {
    let port = state
        .store
        .connect_equipment_to_patch_port(id, req.equipment_id)
        .await?;
    Ok(Json(port))
}

pub async fn disconnect_equipment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PatchPortView>, ApiError> {
    let port = state.store.disconnect_equipment_from_patch_port(id).await?;
    Ok(Json(port))
}
