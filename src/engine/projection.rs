//! Read-side status projection.
//!
//! Port status is never stored. A switch port is occupied when an active
//! direct connection uses it or when a patch port mapped onto it holds
//! equipment; it is mapped when a patch port points at it without
//! equipment; otherwise it is free.

use std::collections::HashMap;

use crate::db::StorageTx;
use crate::error::Result;
use crate::models::{PatchPanelPort, PortStatus};

pub fn patch_port_status(port: &PatchPanelPort) -> PortStatus {
    if port.equipment_id.is_some() {
        PortStatus::Occupied
    } else if port.mapping().is_some() {
        PortStatus::Mapped
    } else {
        PortStatus::Free
    }
}

pub fn switch_port_status(has_active_direct: bool, mapped: Option<&PatchPanelPort>) -> PortStatus {
    if has_active_direct {
        return PortStatus::Occupied;
    }
    match mapped {
        Some(port) if port.equipment_id.is_some() => PortStatus::Occupied,
        Some(_) => PortStatus::Mapped,
        None => PortStatus::Free,
    }
}

/// MappingIndex resolves `(switch id, port number)` to the patch port mapped onto it
#[derive(Debug, Default)]
pub struct MappingIndex {
    by_pair: HashMap<(i64, i32), PatchPanelPort>,
}

impl MappingIndex {
    /// When several patch ports share a pair, one holding equipment wins
    pub fn build(ports: impl IntoIterator<Item = PatchPanelPort>) -> Self {
        let mut by_pair: HashMap<(i64, i32), PatchPanelPort> = HashMap::new();
        for port in ports {
            let Some(pair) = port.mapping() else {
                continue;
            };
            match by_pair.get(&pair) {
                Some(existing) if existing.equipment_id.is_some() || port.equipment_id.is_none() => {}
                _ => {
                    by_pair.insert(pair, port);
                }
            }
        }
        Self { by_pair }
    }

    pub async fn for_switch(tx: &mut dyn StorageTx, switch_id: i64) -> Result<Self> {
        let ports = tx.patch_ports_mapped_to_switch(switch_id).await?;
        Ok(Self::build(ports))
    }

    pub fn lookup(&self, switch_id: i64, number: i32) -> Option<&PatchPanelPort> {
        self.by_pair.get(&(switch_id, number))
    }

    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }
}
