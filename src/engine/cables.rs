//! Cable inventory and the physical connection ledger.
//!
//! Nothing here reads or writes switch or patch port state.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::db::{Store, StorageTx};
use crate::error::{Error, Result};
use crate::models::*;

use super::{require_equipment, require_text};

const NOTE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Append a dated `[TAG text at time]` note on its own line
fn append_note(description: &str, tag: &str, text: &str, at: DateTime<Utc>) -> String {
    let note = format!("[{} {} at {}]", tag, text.trim(), at.format(NOTE_TIME_FORMAT));
    format!("{}\n{}", description, note).trim().to_string()
}

pub async fn get_cable(tx: &mut dyn StorageTx, id: i64) -> Result<Cable> {
    tx.get_cable(id)
        .await?
        .ok_or_else(|| Error::not_found("cable", id))
}

async fn ensure_code_free(tx: &mut dyn StorageTx, code: &str, own_id: Option<i64>) -> Result<()> {
    match tx.find_cable_by_code(code).await? {
        Some(existing) if Some(existing.id) != own_id => Err(Error::conflict(format!(
            "cable code {} is already registered",
            code.trim()
        ))),
        _ => Ok(()),
    }
}

pub async fn register_cable(tx: &mut dyn StorageTx, req: &RegisterCableRequest) -> Result<Cable> {
    require_text("unique_code", &req.unique_code)?;
    require_text("kind", &req.kind)?;
    ensure_code_free(tx, &req.unique_code, None).await?;
    Ok(tx.insert_cable(req).await?)
}

pub async fn update_cable(tx: &mut dyn StorageTx, id: i64, req: &RegisterCableRequest) -> Result<Cable> {
    require_text("unique_code", &req.unique_code)?;
    require_text("kind", &req.kind)?;
    let mut cable = get_cable(tx, id).await?;
    ensure_code_free(tx, &req.unique_code, Some(id)).await?;

    cable.unique_code = req.unique_code.trim().to_string();
    cable.kind = req.kind.clone();
    cable.length = req.length;
    cable.brand = req.brand.clone();
    cable.model = req.model.clone();
    cable.description = req.description.clone();
    cable.status = req.status;
    cable.updated_at = Utc::now();
    tx.update_cable(&cable).await?;
    Ok(cable)
}

pub async fn delete_cable(tx: &mut dyn StorageTx, id: i64) -> Result<()> {
    get_cable(tx, id).await?;
    if let Some(open) = tx.open_cable_connection(id).await? {
        return Err(Error::state(format!(
            "cable {} is still connected (connection {})",
            id, open.id
        )));
    }
    Ok(tx.delete_cable(id).await?)
}

pub async fn list_cables(tx: &mut dyn StorageTx, query: &CableListQuery) -> Result<Vec<CableView>> {
    let connected: HashSet<i64> = tx
        .list_open_cable_connections()
        .await?
        .into_iter()
        .map(|c| c.cable_id)
        .collect();

    Ok(tx
        .list_cables()
        .await?
        .into_iter()
        .filter(|c| query.status.map_or(true, |s| c.status == s))
        .filter(|c| {
            query
                .kind
                .as_deref()
                .map_or(true, |k| c.kind.eq_ignore_ascii_case(k.trim()))
        })
        .map(|cable| {
            let connected = connected.contains(&cable.id);
            CableView { cable, connected }
        })
        .filter(|v| query.connected.map_or(true, |want| v.connected == want))
        .collect())
}

pub async fn mark_defective(tx: &mut dyn StorageTx, id: i64, reason: &str) -> Result<Cable> {
    let mut cable = get_cable(tx, id).await?;
    let now = Utc::now();
    cable.status = CableStatus::Defective;
    cable.description = append_note(&cable.description, "DEFECT", reason, now);
    cable.updated_at = now;
    tx.update_cable(&cable).await?;
    Ok(cable)
}

pub async fn repair(tx: &mut dyn StorageTx, id: i64, req: &RepairCableRequest) -> Result<Cable> {
    if req.status == CableStatus::Defective {
        return Err(Error::validation("repair status must be in-service or in-stock"));
    }
    let mut cable = get_cable(tx, id).await?;
    if cable.status != CableStatus::Defective {
        return Err(Error::state(format!(
            "cable {} is not defective (status: {})",
            id,
            cable.status.as_str()
        )));
    }
    let now = Utc::now();
    cable.status = req.status;
    cable.description = append_note(&cable.description, "REPAIR", &req.justification, now);
    cable.updated_at = now;
    tx.update_cable(&cable).await?;
    Ok(cable)
}

pub async fn create_cable_connection(
    tx: &mut dyn StorageTx,
    req: &CreateCableConnectionRequest,
) -> Result<CableConnection> {
    get_cable(tx, req.cable_id).await?;
    require_equipment(tx, req.from_equipment_id).await?;
    if let Some(to) = req.to_equipment_id {
        require_equipment(tx, to).await?;
    }
    if tx.open_cable_connection(req.cable_id).await?.is_some() {
        return Err(Error::conflict("cable already connected"));
    }
    Ok(tx.insert_cable_connection(req).await?)
}

pub async fn close_cable_connection(tx: &mut dyn StorageTx, id: i64) -> Result<CableConnection> {
    let mut conn = tx
        .get_cable_connection(id)
        .await?
        .ok_or_else(|| Error::not_found("cable connection", id))?;
    if !conn.is_open() {
        return Err(Error::state(format!("cable connection {} is already closed", id)));
    }
    let now = Utc::now();
    tx.close_cable_connection(id, now).await?;
    conn.disconnected_at = Some(now);
    Ok(conn)
}

impl Store {
    pub async fn register_cable(&self, req: &RegisterCableRequest) -> Result<Cable> {
        let mut tx = self.begin().await?;
        let cable = register_cable(tx.as_mut(), req).await?;
        tx.commit().await?;
        tracing::info!(cable_id = cable.id, "Registered cable {}", cable.unique_code);
        Ok(cable)
    }

    pub async fn get_cable(&self, id: i64) -> Result<Cable> {
        let mut tx = self.begin().await?;
        get_cable(tx.as_mut(), id).await
    }

    pub async fn list_cables(&self, query: &CableListQuery) -> Result<Vec<CableView>> {
        let mut tx = self.begin().await?;
        list_cables(tx.as_mut(), query).await
    }

    pub async fn update_cable(&self, id: i64, req: &RegisterCableRequest) -> Result<Cable> {
        let mut tx = self.begin().await?;
        let cable = update_cable(tx.as_mut(), id, req).await?;
        tx.commit().await?;
        tracing::info!(cable_id = id, "Updated cable {}", cable.unique_code);
        Ok(cable)
    }

    pub async fn delete_cable(&self, id: i64) -> Result<()> {
        let mut tx = self.begin().await?;
        delete_cable(tx.as_mut(), id).await?;
        tx.commit().await?;
        tracing::info!(cable_id = id, "Deleted cable");
        Ok(())
    }

    pub async fn mark_cable_defective(&self, id: i64, reason: &str) -> Result<Cable> {
        let mut tx = self.begin().await?;
        let cable = mark_defective(tx.as_mut(), id, reason).await?;
        tx.commit().await?;
        tracing::info!(cable_id = id, reason, "Marked cable defective");
        Ok(cable)
    }

    pub async fn repair_cable(&self, id: i64, req: &RepairCableRequest) -> Result<Cable> {
        let mut tx = self.begin().await?;
        let cable = repair(tx.as_mut(), id, req).await?;
        tx.commit().await?;
        tracing::info!(cable_id = id, status = cable.status.as_str(), "Repaired cable");
        Ok(cable)
    }

    pub async fn create_cable_connection(&self, req: &CreateCableConnectionRequest) -> Result<CableConnection> {
        let mut tx = self.begin().await?;
        let conn = create_cable_connection(tx.as_mut(), req).await?;
        tx.commit().await?;
        tracing::info!(
            cable_connection_id = conn.id,
            cable_id = conn.cable_id,
            from_equipment_id = conn.from_equipment_id,
            "Recorded cable connection"
        );
        Ok(conn)
    }

    pub async fn close_cable_connection(&self, id: i64) -> Result<CableConnection> {
        let mut tx = self.begin().await?;
        let conn = close_cable_connection(tx.as_mut(), id).await?;
        tx.commit().await?;
        tracing::info!(cable_connection_id = id, cable_id = conn.cable_id, "Closed cable connection");
        Ok(conn)
    }

    pub async fn list_open_cable_connections(&self) -> Result<Vec<CableConnection>> {
        let mut tx = self.begin().await?;
        Ok(tx.list_open_cable_connections().await?)
    }

    pub async fn list_cable_connections_for_room(&self, room_id: i64) -> Result<Vec<CableConnection>> {
        let mut tx = self.begin().await?;
        Ok(tx.list_cable_connections_for_room(room_id).await?)
    }
}
