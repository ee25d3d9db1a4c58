//! Patch port to switch port mapping and patch port to equipment links.
//!
//! A mapping is a loose `(switch id, port number)` pair: the switch must
//! exist when the mapping is made, the port number need not.

use chrono::Utc;

use crate::db::{Store, StorageTx};
use crate::error::{Error, Result};
use crate::models::*;

use super::connections::ensure_unlinked;
use super::patch_panels::port_view;
use super::require_equipment;

async fn require_patch_port(tx: &mut dyn StorageTx, id: i64) -> Result<PatchPanelPort> {
    tx.get_patch_port(id)
        .await?
        .ok_or_else(|| Error::not_found("patch port", id))
}

pub async fn map_patch_port(
    tx: &mut dyn StorageTx,
    patch_port_id: i64,
    req: &MapPatchPortRequest,
) -> Result<PatchPanelPort> {
    let mut port = require_patch_port(tx, patch_port_id).await?;

    let target = match (req.switch_id, req.switch_port) {
        (None, None) => None,
        (Some(switch_id), Some(number)) => Some((switch_id, number)),
        _ => {
            return Err(Error::validation(
                "switch_id and switch_port must be given together",
            ))
        }
    };

    if let Some((switch_id, number)) = target {
        if number <= 0 {
            return Err(Error::validation("switch_port must be greater than zero"));
        }
        if port.mapping() == Some((switch_id, number)) {
            return Ok(port);
        }
        tx.get_switch(switch_id)
            .await?
            .ok_or_else(|| Error::not_found("switch", switch_id))?;

        let holder = tx
            .patch_ports_mapped_to_switch(switch_id)
            .await?
            .into_iter()
            .find(|p| p.id != port.id && p.mapped_switch_port == Some(number));
        if let Some(holder) = holder {
            return Err(Error::conflict(format!(
                "switch {} port {} is already mapped to patch port {}",
                switch_id, number, holder.id
            )));
        }
    }

    port.mapped_switch_id = target.map(|t| t.0);
    port.mapped_switch_port = target.map(|t| t.1);
    tx.update_patch_port(&port).await?;
    Ok(port)
}

/// A mapped switch port already carrying a direct connection cannot take
/// patched equipment as well
async fn ensure_switch_port_unwired(tx: &mut dyn StorageTx, switch_id: i64, number: i32) -> Result<()> {
    let Some(switch_port) = tx
        .list_switch_ports(switch_id)
        .await?
        .into_iter()
        .find(|p| p.number == number)
    else {
        return Ok(());
    };
    if !tx.active_connections_for_ports(&[switch_port.id]).await?.is_empty() {
        return Err(Error::PortNotFree {
            port_id: switch_port.id,
            status: PortStatus::Occupied,
        });
    }
    Ok(())
}

pub async fn connect_equipment(
    tx: &mut dyn StorageTx,
    patch_port_id: i64,
    equipment_id: i64,
) -> Result<PatchPanelPort> {
    let mut port = require_patch_port(tx, patch_port_id).await?;
    if let Some(current) = port.equipment_id {
        return Err(Error::PatchPortOccupied {
            patch_port_id,
            equipment_id: current,
        });
    }
    require_equipment(tx, equipment_id).await?;
    ensure_unlinked(tx, equipment_id).await?;
    if let Some((switch_id, number)) = port.mapping() {
        ensure_switch_port_unwired(tx, switch_id, number).await?;
    }

    port.equipment_id = Some(equipment_id);
    port.connected_at = Some(Utc::now());
    tx.update_patch_port(&port).await?;
    Ok(port)
}

/// Clear the equipment link, returning the equipment that was attached
pub async fn disconnect_equipment(
    tx: &mut dyn StorageTx,
    patch_port_id: i64,
) -> Result<(PatchPanelPort, i64)> {
    let mut port = require_patch_port(tx, patch_port_id).await?;
    let Some(equipment_id) = port.equipment_id else {
        return Err(Error::validation(format!(
            "no equipment is connected to patch port {}",
            patch_port_id
        )));
    };

    port.equipment_id = None;
    port.connected_at = None;
    tx.update_patch_port(&port).await?;
    Ok((port, equipment_id))
}

/// Clear every patch port link the equipment holds
pub(crate) async fn release_equipment(tx: &mut dyn StorageTx, equipment_id: i64) -> Result<Vec<i64>> {
    let mut released = Vec::new();
    for mut port in tx.patch_ports_for_equipment(equipment_id).await? {
        port.equipment_id = None;
        port.connected_at = None;
        tx.update_patch_port(&port).await?;
        released.push(port.id);
    }
    Ok(released)
}

impl Store {
    pub async fn map_patch_port(&self, patch_port_id: i64, req: &MapPatchPortRequest) -> Result<PatchPortView> {
        let mut tx = self.begin().await?;
        let port = map_patch_port(tx.as_mut(), patch_port_id, req).await?;
        let view = port_view(tx.as_mut(), port).await?;
        tx.commit().await?;
        match (view.mapped_switch_id, view.mapped_switch_port) {
            (Some(switch_id), Some(number)) => {
                tracing::info!(patch_port_id, switch_id, switch_port = number, "Mapped patch port")
            }
            _ => tracing::info!(patch_port_id, "Cleared patch port mapping"),
        }
        Ok(view)
    }

    pub async fn connect_equipment_to_patch_port(
        &self,
        patch_port_id: i64,
        equipment_id: i64,
    ) -> Result<PatchPortView> {
        let mut tx = self.begin().await?;
        let port = connect_equipment(tx.as_mut(), patch_port_id, equipment_id).await?;
        let view = port_view(tx.as_mut(), port).await?;
        tx.commit().await?;
        tracing::info!(patch_port_id, equipment_id, keystone = %view.keystone, "Connected equipment to patch port");
        Ok(view)
    }

    pub async fn disconnect_equipment_from_patch_port(&self, patch_port_id: i64) -> Result<PatchPortView> {
        let mut tx = self.begin().await?;
        let (port, equipment_id) = disconnect_equipment(tx.as_mut(), patch_port_id).await?;
        let view = port_view(tx.as_mut(), port).await?;
        tx.commit().await?;
        tracing::info!(patch_port_id, equipment_id, "Disconnected equipment from patch port");
        Ok(view)
    }
}
