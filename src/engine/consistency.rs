//! Read-only audit of the link invariants. Reports, never repairs.

use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::db::{Store, StorageTx};
use crate::error::Result;
use crate::models::*;

pub async fn check_consistency(tx: &mut dyn StorageTx) -> Result<ConsistencyReport> {
    let connections = tx.list_active_connections().await?;
    let patch_ports = tx.list_all_patch_ports().await?;
    let switch_ids: HashSet<i64> = tx.list_switches().await?.into_iter().map(|s| s.id).collect();

    let port_ids: Vec<i64> = connections.iter().map(|c| c.port_id).collect();
    let existing_ports: HashMap<i64, (i64, i32)> = tx
        .switch_ports_by_ids(&port_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, (p.switch_id, p.number)))
        .collect();

    let mut by_equipment: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for conn in &connections {
        by_equipment.entry(conn.equipment_id).or_default().push(conn.id);
    }
    let mut patch_by_equipment: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    let mut by_mapping: BTreeMap<(i64, i32), Vec<i64>> = BTreeMap::new();
    for port in &patch_ports {
        if let Some(equipment_id) = port.equipment_id {
            patch_by_equipment.entry(equipment_id).or_default().push(port.id);
        }
        if let Some(pair) = port.mapping() {
            by_mapping.entry(pair).or_default().push(port.id);
        }
    }

    let mut violations = Vec::new();
    for (&equipment_id, conn_ids) in &by_equipment {
        if let Some(patch_ids) = patch_by_equipment.get(&equipment_id) {
            violations.push(Violation::DualLink {
                equipment_id,
                connection_id: conn_ids[0],
                patch_port_id: patch_ids[0],
            });
        }
        if conn_ids.len() > 1 {
            violations.push(Violation::MultipleActiveConnections {
                equipment_id,
                connection_ids: conn_ids.clone(),
            });
        }
    }
    for (&equipment_id, patch_ids) in &patch_by_equipment {
        if patch_ids.len() > 1 {
            violations.push(Violation::MultiplePatchPorts {
                equipment_id,
                patch_port_ids: patch_ids.clone(),
            });
        }
    }
    for (&(switch_id, switch_port), patch_ids) in &by_mapping {
        if patch_ids.len() > 1 {
            violations.push(Violation::DuplicateMapping {
                switch_id,
                switch_port,
                patch_port_ids: patch_ids.clone(),
            });
        }
    }
    for conn in &connections {
        if !existing_ports.contains_key(&conn.port_id) {
            violations.push(Violation::ConnectionOnMissingPort {
                connection_id: conn.id,
                port_id: conn.port_id,
            });
        }
    }
    for port in &patch_ports {
        if let Some((switch_id, _)) = port.mapping() {
            if !switch_ids.contains(&switch_id) {
                violations.push(Violation::MappingToMissingSwitch {
                    patch_port_id: port.id,
                    switch_id,
                });
            }
        }
    }

    for conn in &connections {
        let Some(pair) = existing_ports.get(&conn.port_id) else {
            continue;
        };
        let patched = by_mapping.get(pair).into_iter().flatten().find(|id| {
            patch_ports
                .iter()
                .any(|p| p.id == **id && p.equipment_id.is_some())
        });
        if let Some(&patch_port_id) = patched {
            violations.push(Violation::SharedSwitchPort {
                switch_id: pair.0,
                switch_port: pair.1,
                connection_id: conn.id,
                patch_port_id,
            });
        }
    }

    Ok(ConsistencyReport {
        checked_at: Some(Utc::now()),
        violations,
    })
}

impl Store {
    pub async fn check_consistency(&self) -> Result<ConsistencyReport> {
        let mut tx = self.begin().await?;
        let report = check_consistency(tx.as_mut()).await?;
        if !report.is_clean() {
            tracing::warn!(violations = report.violations.len(), "Consistency check found violations");
        }
        Ok(report)
    }
}
