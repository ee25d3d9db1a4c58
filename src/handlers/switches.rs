use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

/// List all switches, newest first
pub async fn list_switches(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Switch>>, ApiError> {
    let switches = state.store.list_switches().await?;
    Ok(Json(switches))
}

/// Get a single switch by ID
pub async fn get_switch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Switch>, ApiError> {
    let switch = state.store.get_switch(id).await?;
    Ok(Json(switch))
}

/// Create a switch and generate its ports
pub async fn create_switch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSwitchRequest>,
) -> Result<(StatusCode, Json<Switch>), ApiError> {
    let switch = state.store.create_switch(&req).await?;
    Ok(created(switch))
}

pub async fn update_switch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateSwitchRequest>,
) -> Result<Json<Switch>, ApiError> {
    let switch = state.store.update_switch(id, &req).await?;
    Ok(Json(switch))
}

/// Delete a switch, retiring its connections and mappings
pub async fn delete_switch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<PortRebuildOutcome>, ApiError> {
    let outcome = state.store.delete_switch(id).await?;
    Ok(Json(outcome))
}

/// List a switch's ports with their derived status
pub async fn list_ports(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<SwitchPortView>>, ApiError> {
    let ports = state.store.list_switch_ports(id).await?;
    Ok(Json(ports))
}

pub async fn recreate_ports(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<RecreatePortsRequest>,
) -> Result<Json<PortRebuildOutcome>, ApiError> {
    let outcome = state.store.recreate_switch_ports(id, req.port_count).await?;
    Ok(Json(outcome))
}

pub async fn add_ports(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<AddPortsRequest>,
) -> Result<(StatusCode, Json<Vec<SwitchPort>>), ApiError> {
    let added = state.store.add_switch_ports(id, req.extra_count).await?;
    Ok(created(added))
}

/// Free a switch port: retire its connection and clear patch mappings onto it
pub async fn disconnect_port(
    State(state): State<Arc<AppState>>,
    Path(port_id): Path<i64>,
) -> Result<Json<SwitchPortDisconnect>, ApiError> {
    let outcome = state.store.disconnect_switch_port(port_id).await?;
    Ok(Json(outcome))
}
