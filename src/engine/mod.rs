//! Connectivity engine.
//!
//! Every operation is a free function over `&mut dyn StorageTx` so it runs
//! inside the caller's transaction; the `Store` methods defined alongside
//! open that transaction, call the function and commit.

pub mod cables;
pub mod connections;
pub mod consistency;
pub mod mapping;
pub mod patch_panels;
pub mod ports;
pub mod projection;
pub mod rooms;

use std::collections::HashMap;

use crate::db::StorageTx;
use crate::error::{Error, Result};
use crate::models::{Equipment, EquipmentSummary, PatchPanel};

/// Directory resolves equipment and room names for view building
#[derive(Debug, Default)]
pub(crate) struct Directory {
    equipment: HashMap<i64, Equipment>,
    room_names: HashMap<i64, String>,
}

impl Directory {
    pub async fn load(tx: &mut dyn StorageTx, ids: impl IntoIterator<Item = i64>) -> Result<Self> {
        let mut ids: Vec<i64> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(Self::default());
        }

        let equipment = tx
            .equipment_by_ids(&ids)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();
        let room_names = tx
            .list_rooms()
            .await?
            .into_iter()
            .map(|r| (r.id, r.name))
            .collect();
        Ok(Self {
            equipment,
            room_names,
        })
    }

    pub fn summary(&self, equipment_id: i64) -> Option<EquipmentSummary> {
        let equipment = self.equipment.get(&equipment_id)?;
        let room_name = equipment
            .room_id
            .and_then(|id| self.room_names.get(&id).cloned());
        Some(equipment.summary(room_name))
    }
}

/// Memoised patch panel lookups while building port views
#[derive(Debug, Default)]
pub(crate) struct PanelCache {
    panels: HashMap<i64, Option<PatchPanel>>,
}

impl PanelCache {
    pub async fn get(&mut self, tx: &mut dyn StorageTx, id: i64) -> Result<Option<&PatchPanel>> {
        if !self.panels.contains_key(&id) {
            let panel = tx.get_patch_panel(id).await?;
            self.panels.insert(id, panel);
        }
        Ok(self.panels.get(&id).and_then(|p| p.as_ref()))
    }
}

pub(crate) async fn require_equipment(tx: &mut dyn StorageTx, id: i64) -> Result<Equipment> {
    tx.get_equipment(id)
        .await?
        .ok_or_else(|| Error::not_found("equipment", id))
}

/// Highest port number a switch or patch panel may carry
pub(crate) const MAX_PORT_NUMBER: i32 = 4096;

/// Check a requested port count against the port number ceiling
pub(crate) fn require_port_count(field: &str, count: i32) -> Result<()> {
    if count <= 0 {
        return Err(Error::validation(format!("{} must be greater than zero", field)));
    }
    if count > MAX_PORT_NUMBER {
        return Err(Error::validation(format!(
            "{} must be at most {}",
            field, MAX_PORT_NUMBER
        )));
    }
    Ok(())
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{} is required", field)));
    }
    Ok(())
}
